use anyhow::anyhow;
use scholaris_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use scholaris_config::JwtConfig;
use scholaris_core::{AppError, UserRole, hash_password, verify_password};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::auth::{
    AuthUserProfile, ChangePasswordDto, LoginRequest, LoginResponse, RefreshTokenResponse,
};
use scholaris_models::schools::SchoolSummary;
use scholaris_models::users::{User, UserCredentials};
use scholaris_observability::{track_jwt_issued, track_user_login_failure, track_user_login_success};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::modules::users::service::{USER_COLUMNS, normalize_email};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const TOKEN_TYPE: &str = "Bearer";

pub struct AuthService;

impl AuthService {
    /// Wrong email and wrong password share one message so accounts cannot
    /// be enumerated.
    #[instrument(skip(db, dto, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password, role, school_id, is_active FROM users WHERE email = $1",
        )
        .bind(normalize_email(&dto.email))
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&dto.password, &credentials.password)? {
            track_user_login_failure("wrong_password");
            tracing::warn!(user.id = %credentials.id, "Login failed: wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !credentials.is_active {
            track_user_login_failure("inactive");
            return Err(AppError::forbidden("Account is deactivated".to_string()));
        }

        let access_token = create_access_token(
            credentials.id,
            &credentials.email,
            credentials.role,
            credentials.school_id,
            jwt_config,
        )?;
        let refresh_token = create_refresh_token(credentials.id, &credentials.email, jwt_config)?;
        track_jwt_issued();

        let mut tx = db.begin().await?;
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(credentials.id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                credentials.id,
                credentials.school_id,
                AuditAction::Login,
                "user",
                Some(credentials.id),
            ),
        )
        .await?;
        tx.commit().await?;

        let user = Self::profile(db, credentials.id).await?;

        track_user_login_success(credentials.role.as_str());
        tracing::info!(user.id = %credentials.id, role = %credentials.role, "User logged in");

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
        })
    }

    /// Mints a new access token. Permissions and school come from the current
    /// row, not from the refresh token.
    #[instrument(skip(db, refresh_token, jwt_config))]
    pub async fn refresh(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<RefreshTokenResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid refresh token".to_string()))?;

        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password, role, school_id, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::unauthorized("Invalid refresh token".to_string()))?;

        let access_token = create_access_token(
            credentials.id,
            &credentials.email,
            credentials.role,
            credentials.school_id,
            jwt_config,
        )?;
        track_jwt_issued();

        Ok(RefreshTokenResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: jwt_config.access_token_expiry,
        })
    }

    #[instrument(skip(db))]
    pub async fn profile(db: &PgPool, user_id: Uuid) -> Result<AuthUserProfile, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        let school = match user.school_id {
            Some(school_id) => {
                sqlx::query_as::<_, SchoolSummary>("SELECT id, name, code FROM schools WHERE id = $1")
                    .bind(school_id)
                    .fetch_optional(db)
                    .await?
            }
            None => None,
        };

        let profile_table = match user.role {
            UserRole::Teacher => Some("teachers"),
            UserRole::Student => Some("students"),
            UserRole::Parent => Some("parents"),
            UserRole::SuperAdmin | UserRole::SchoolAdmin => None,
        };
        let profile_id = match profile_table {
            Some(table) => {
                sqlx::query_scalar::<_, Uuid>(&format!("SELECT id FROM {} WHERE user_id = $1", table))
                    .bind(user.id)
                    .fetch_optional(db)
                    .await?
            }
            None => None,
        };

        Ok(AuthUserProfile {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            school,
            profile_id,
            permissions: user.role.permissions().iter().map(|p| p.to_string()).collect(),
            created_at: user.created_at,
        })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, email, password, role, school_id, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &credentials.password)? {
            return Err(AppError::bad_request(anyhow!("Current password is incorrect")));
        }
        if dto.current_password == dto.new_password {
            return Err(AppError::bad_request(anyhow!(
                "New password must differ from the current password"
            )));
        }

        let hashed = hash_password(&dto.new_password)?;

        let mut tx = db.begin().await?;
        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(hashed)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        AuditService::record(
            &mut *tx,
            AuditEntry::new(
                user_id,
                credentials.school_id,
                AuditAction::PasswordChange,
                "user",
                Some(user_id),
            ),
        )
        .await?;
        tx.commit().await?;

        Ok(())
    }
}
