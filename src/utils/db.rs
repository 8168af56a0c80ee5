use scholaris_core::AppError;

/// Turns a unique violation into a 400 with `message`; anything else is a 500.
pub fn unique_violation(err: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!(message.into()));
    }
    AppError::database(err)
}

/// Like [`unique_violation`] but looks at the violated constraint name so one
/// insert can report which column clashed.
pub fn constraint_violation(err: sqlx::Error, messages: &[(&str, &str)]) -> AppError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or_default();
        let message = messages
            .iter()
            .find(|(name, _)| constraint.contains(name))
            .or_else(|| messages.first())
            .map(|(_, message)| *message)
            .unwrap_or("Record already exists");
        return AppError::bad_request(anyhow::anyhow!(message.to_string()));
    }
    AppError::database(err)
}

/// Escapes `%` and `_` and wraps the term for an `ILIKE` substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("math"), "%math%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_non_database_errors_are_internal() {
        let err = unique_violation(sqlx::Error::RowNotFound, "duplicate");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err = constraint_violation(sqlx::Error::RowNotFound, &[("email", "duplicate email")]);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
