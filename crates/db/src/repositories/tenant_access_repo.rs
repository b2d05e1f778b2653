use sqlx::PgPool;

use ispsync_core::types::DbId;

/// Membership lookups on `tenant_memberships`.
pub struct TenantAccessRepo;

impl TenantAccessRepo {
    pub async fn is_member(pool: &PgPool, user_id: DbId, tenant_id: DbId) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM tenant_memberships WHERE user_id = $1 AND tenant_id = $2
             )",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn grant(
        pool: &PgPool,
        user_id: DbId,
        tenant_id: DbId,
        role: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO tenant_memberships (user_id, tenant_id, role) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, tenant_id) DO UPDATE SET role = EXCLUDED.role",
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role)
        .execute(pool)
        .await?;
        Ok(())
    }
}
