use anyhow::anyhow;
use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::classes::{
    Class, ClassFilterParams, ClassRoster, CreateClassDto, PaginatedClassesResponse,
    UpdateClassDto,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::modules::students::StudentService;
use crate::utils::auth_helpers::{StudentScope, ensure_in_scope, push_school_scope};
use crate::utils::db::{like_pattern, unique_violation};

const CLASS_SELECT: &str = r#"SELECT c.id, c.school_id, c.name, c.section, c.academic_year, c.room,
       c.class_teacher_id,
       NULLIF(TRIM(CONCAT(tu.first_name, ' ', tu.last_name)), '') AS class_teacher_name,
       (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count,
       c.created_at, c.updated_at
FROM classes c
LEFT JOIN teachers t ON t.id = c.class_teacher_id
LEFT JOIN users tu ON tu.id = t.user_id"#;

const DUPLICATE_CLASS: &str = "A class with this name and section already exists";

async fn ensure_teacher_in_school(db: &PgPool, teacher_id: Uuid, school_id: Uuid) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM teachers WHERE id = $1 AND school_id = $2)",
    )
    .bind(teacher_id)
    .bind(school_id)
    .fetch_one(db)
    .await?;

    if !exists {
        return Err(AppError::bad_request(anyhow!("Teacher does not belong to this school")));
    }
    Ok(())
}

pub struct ClassService;

impl ClassService {
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "INSERT", db.table = "classes"))]
    pub async fn create_class(
        db: &PgPool,
        actor_id: Uuid,
        school_id: Uuid,
        dto: CreateClassDto,
    ) -> Result<Class, AppError> {
        if let Some(teacher_id) = dto.class_teacher_id {
            ensure_teacher_in_school(db, teacher_id, school_id).await?;
        }

        let section = dto.section.as_deref().map(str::trim).unwrap_or_default();

        let mut tx = db.begin().await?;

        let class_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO classes (school_id, name, section, academic_year, room, class_teacher_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id"#,
        )
        .bind(school_id)
        .bind(dto.name.trim())
        .bind(section)
        .bind(&dto.academic_year)
        .bind(&dto.room)
        .bind(dto.class_teacher_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_CLASS))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school_id), AuditAction::Create, "class", Some(class_id))
                .details(json!({ "name": dto.name, "section": section })),
        )
        .await?;

        let class = sqlx::query_as::<_, Class>(&format!("{} WHERE c.id = $1", CLASS_SELECT))
            .bind(class_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(class)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        filters: &ClassFilterParams,
    ) {
        push_school_scope(qb, "c.school_id", scope);

        if let Some(year) = &filters.academic_year {
            qb.push(" AND c.academic_year = ");
            qb.push_bind(year.clone());
        }
        if let Some(teacher_id) = filters.class_teacher_id {
            qb.push(" AND c.class_teacher_id = ");
            qb.push_bind(teacher_id);
        }
        if let Some(search) = &filters.search {
            let pattern = like_pattern(search);
            qb.push(" AND (c.name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR c.section ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR c.room ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "classes"))]
    pub async fn list_classes(
        db: &PgPool,
        scope: Option<Uuid>,
        filters: ClassFilterParams,
    ) -> Result<PaginatedClassesResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM classes c WHERE TRUE");
        Self::push_filters(&mut count, scope, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("{} WHERE TRUE", CLASS_SELECT));
        Self::push_filters(&mut query, scope, &filters);
        query.push(" ORDER BY c.name, c.section, c.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<Class>().fetch_all(db).await?;

        Ok(PaginatedClassesResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "classes"))]
    pub async fn get_class(db: &PgPool, id: Uuid, scope: Option<Uuid>) -> Result<Class, AppError> {
        let class = sqlx::query_as::<_, Class>(&format!("{} WHERE c.id = $1", CLASS_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;

        ensure_in_scope(scope, class.school_id, "Class")?;
        Ok(class)
    }

    /// The class with its enrolled students. Students and parents only see
    /// the rows they are entitled to in the roster.
    pub async fn get_roster(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
        students: &StudentScope,
    ) -> Result<ClassRoster, AppError> {
        let class = Self::get_class(db, id, scope).await?;
        let students = StudentService::students_in_class(db, class.id)
            .await?
            .into_iter()
            .filter(|s| students.allows(s.id))
            .collect();

        Ok(ClassRoster { class, students })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "classes"))]
    pub async fn update_class(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateClassDto,
    ) -> Result<Class, AppError> {
        let existing = Self::get_class(db, id, scope).await?;

        if let Some(Some(teacher_id)) = dto.class_teacher_id {
            ensure_teacher_in_school(db, teacher_id, existing.school_id).await?;
        }

        let mut tx = db.begin().await?;

        sqlx::query(
            r#"UPDATE classes
               SET name = COALESCE($2, name),
                   section = COALESCE($3, section),
                   academic_year = COALESCE($4, academic_year),
                   room = COALESCE($5, room),
                   class_teacher_id = CASE WHEN $6 THEN $7 ELSE class_teacher_id END,
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.section.as_deref().map(str::trim))
        .bind(&dto.academic_year)
        .bind(&dto.room)
        .bind(dto.class_teacher_id.is_some())
        .bind(dto.class_teacher_id.flatten())
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, DUPLICATE_CLASS))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Update, "class", Some(id))
                .details(json!({
                    "name": dto.name,
                    "section": dto.section,
                    "class_teacher_id": dto.class_teacher_id,
                })),
        )
        .await?;

        let class = sqlx::query_as::<_, Class>(&format!("{} WHERE c.id = $1", CLASS_SELECT))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(class)
    }

    /// Students of a deleted class stay enrolled in the school, unassigned.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "classes"))]
    pub async fn delete_class(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<(), AppError> {
        let existing = Self::get_class(db, id, scope).await?;

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(existing.school_id), AuditAction::Delete, "class", Some(id))
                .details(json!({ "name": existing.name, "section": existing.section })),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM classes c WHERE TRUE");
        let filters = ClassFilterParams {
            academic_year: Some("2025/2026".to_string()),
            search: Some("grade".to_string()),
            ..Default::default()
        };
        ClassService::push_filters(&mut qb, Some(Uuid::new_v4()), &filters);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM classes c WHERE TRUE AND c.school_id = $1 \
             AND c.academic_year = $2 AND (c.name ILIKE $3 OR c.section ILIKE $4 OR c.room ILIKE $5)"
        );
    }
}
