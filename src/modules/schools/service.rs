use scholaris_core::{AppError, PaginationMeta};
use scholaris_models::audit::{AuditAction, AuditEntry};
use scholaris_models::schools::{
    CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolWithStats,
    UpdateSchoolDto,
};
use scholaris_observability::track_school_created;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::modules::audit_logs::AuditService;
use crate::utils::auth_helpers::{ensure_in_scope, push_school_scope};
use crate::utils::db::{constraint_violation, like_pattern};

pub(crate) const SCHOOL_COLUMNS: &str = "id, name, code, address, phone, email, created_at, updated_at";

const DUPLICATE_SCHOOL: &[(&str, &str)] = &[
    ("schools_name_key", "A school with this name already exists"),
    ("schools_code_key", "A school with this code already exists"),
];

pub struct SchoolService;

impl SchoolService {
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(
        db: &PgPool,
        actor_id: Uuid,
        dto: CreateSchoolDto,
    ) -> Result<School, AppError> {
        let mut tx = db.begin().await?;

        let school = sqlx::query_as::<_, School>(&format!(
            "INSERT INTO schools (name, code, address, phone, email)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            SCHOOL_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(dto.code.trim())
        .bind(&dto.address)
        .bind(&dto.phone)
        .bind(&dto.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_violation(e, DUPLICATE_SCHOOL))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school.id), AuditAction::Create, "school", Some(school.id))
                .details(json!({ "name": school.name, "code": school.code })),
        )
        .await?;

        tx.commit().await?;

        track_school_created();
        tracing::info!(school.id = %school.id, "School created");
        Ok(school)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        scope: Option<Uuid>,
        filters: &SchoolFilterParams,
    ) {
        push_school_scope(qb, "id", scope);
        if let Some(name) = &filters.name {
            qb.push(" AND name ILIKE ");
            qb.push_bind(like_pattern(name));
        }
        if let Some(code) = &filters.code {
            qb.push(" AND code ILIKE ");
            qb.push_bind(like_pattern(code));
        }
    }

    /// `scope` narrows the listing to one school for school-scoped callers.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn list_schools(
        db: &PgPool,
        scope: Option<Uuid>,
        filters: SchoolFilterParams,
    ) -> Result<PaginatedSchoolsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM schools WHERE TRUE");
        Self::push_filters(&mut count, scope, &filters);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM schools WHERE TRUE", SCHOOL_COLUMNS));
        Self::push_filters(&mut query, scope, &filters);
        query.push(" ORDER BY name LIMIT ");
        query.push_bind(filters.pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(filters.pagination.offset());

        let data = query.build_query_as::<School>().fetch_all(db).await?;

        Ok(PaginatedSchoolsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school(
        db: &PgPool,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<SchoolWithStats, AppError> {
        ensure_in_scope(scope, id, "School")?;

        let school = sqlx::query_as::<_, SchoolWithStats>(
            r#"SELECT s.id, s.name, s.code, s.address, s.phone, s.email,
                      (SELECT COUNT(*) FROM users u WHERE u.school_id = s.id AND u.role = 'school_admin') AS admin_count,
                      (SELECT COUNT(*) FROM teachers t WHERE t.school_id = s.id) AS teacher_count,
                      (SELECT COUNT(*) FROM students st WHERE st.school_id = s.id) AS student_count,
                      (SELECT COUNT(*) FROM parents p WHERE p.school_id = s.id) AS parent_count,
                      (SELECT COUNT(*) FROM classes c WHERE c.school_id = s.id) AS class_count,
                      s.created_at, s.updated_at
               FROM schools s
               WHERE s.id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))?;

        Ok(school)
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        actor_id: Uuid,
        id: Uuid,
        scope: Option<Uuid>,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        ensure_in_scope(scope, id, "School")?;

        let mut tx = db.begin().await?;

        let school = sqlx::query_as::<_, School>(&format!(
            "UPDATE schools
             SET name = COALESCE($2, name),
                 code = COALESCE($3, code),
                 address = COALESCE($4, address),
                 phone = COALESCE($5, phone),
                 email = COALESCE($6, email),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            SCHOOL_COLUMNS
        ))
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.code.as_deref().map(str::trim))
        .bind(&dto.address)
        .bind(&dto.phone)
        .bind(&dto.email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| constraint_violation(e, DUPLICATE_SCHOOL))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))?;

        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, Some(school.id), AuditAction::Update, "school", Some(school.id)),
        )
        .await?;

        tx.commit().await?;
        Ok(school)
    }

    /// Removes the school and, through cascading keys, every row it owns.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "schools"))]
    pub async fn delete_school(db: &PgPool, actor_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let name = sqlx::query_scalar::<_, String>("DELETE FROM schools WHERE id = $1 RETURNING name")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))?;

        // The school's own audit rows are gone with it, so this one is global.
        AuditService::record(
            &mut *tx,
            AuditEntry::new(actor_id, None, AuditAction::Delete, "school", Some(id))
                .details(json!({ "name": name })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(school.id = %id, "School deleted");
        Ok(())
    }
}
