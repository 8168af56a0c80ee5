use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditEntry, AuditLog, AuditLogFilterParams, PaginatedAuditLogsResponse};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::utils::auth_helpers::push_school_scope;

pub struct AuditService;

impl AuditService {
    /// Writes one entry. Accepts a pool or an open transaction so the entry
    /// commits together with the change it describes.
    #[instrument(skip(executor, entry), fields(audit.action = ?entry.action, audit.entity = entry.entity_type))]
    pub async fn record<'e, E>(executor: E, entry: AuditEntry) -> Result<(), AppError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"INSERT INTO audit_logs (school_id, actor_id, action, entity_type, entity_id, details)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(entry.school_id)
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.details)
        .execute(executor)
        .await?;

        Ok(())
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        filters: &AuditLogFilterParams,
    ) {
        push_school_scope(qb, "a.school_id", scope);

        if let Some(entity_type) = &filters.entity_type {
            qb.push(" AND a.entity_type = ");
            qb.push_bind(entity_type.clone());
        }
        if let Some(entity_id) = filters.entity_id {
            qb.push(" AND a.entity_id = ");
            qb.push_bind(entity_id);
        }
        if let Some(action) = filters.action {
            qb.push(" AND a.action = ");
            qb.push_bind(action);
        }
        if let Some(actor_id) = filters.actor_id {
            qb.push(" AND a.actor_id = ");
            qb.push_bind(actor_id);
        }
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "audit_logs"))]
    pub async fn list_logs(
        db: &PgPool,
        scope: Option<Uuid>,
        filters: AuditLogFilterParams,
    ) -> Result<PaginatedAuditLogsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs a WHERE TRUE");
        Self::push_filters(&mut count, scope, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"SELECT a.id, a.school_id, a.actor_id, u.email AS actor_email, a.action,
                      a.entity_type, a.entity_id, a.details, a.created_at
               FROM audit_logs a
               LEFT JOIN users u ON u.id = a.actor_id
               WHERE TRUE"#,
        );
        Self::push_filters(&mut query, scope, &filters);
        query.push(" ORDER BY a.created_at DESC, a.id LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<AuditLog>().fetch_all(db).await?;

        Ok(PaginatedAuditLogsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }
}
