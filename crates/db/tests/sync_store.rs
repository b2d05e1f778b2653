//! Integration tests for the PostgreSQL sync stores.
//!
//! Each test receives a fresh database with the crate migrations applied.
//! They need a reachable server in `DATABASE_URL`, so they are ignored by
//! default: run with `cargo test -p ispsync-db -- --ignored`.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use ispsync_core::integration::{
    MikrotikConfig, ProviderConfig, ProviderType, RadiusConfig, SyncMode, SyncStatus,
};
use ispsync_core::roles::{ROLE_STAFF, ROLE_SUPER_ADMIN};
use ispsync_core::sync::access::{AccessGate, Caller};
use ispsync_core::sync::action::{SyncAction, TriggerSource};
use ispsync_core::sync::store::{
    CustomerStore, IntegrationStore, IntegrationSyncUpdate, NewSyncLogEntry, SyncLogStore,
};
use ispsync_core::types::DbId;
use ispsync_db::models::integration::{CredentialChange, IntegrationChanges, NewIntegration};
use ispsync_db::repositories::{IntegrationRepo, SyncLogRepo, TenantAccessRepo};
use ispsync_db::{PgAccessGate, PgSyncStore};

fn new_router(tenant_id: DbId) -> NewIntegration {
    NewIntegration {
        tenant_id,
        name: "Core router".into(),
        config: ProviderConfig::Mikrotik(MikrotikConfig {
            address_list: Some("suspended".into()),
            ..Default::default()
        }),
        host: Some("203.0.113.1".into()),
        port: Some(8080),
        username: Some("api".into()),
        encrypted_credentials: Some(vec![9, 9, 9]),
        sync_mode: SyncMode::Manual,
        sync_interval_minutes: None,
        is_enabled: true,
    }
}

fn log_entry(tenant_id: DbId, integration_id: DbId, status: SyncStatus) -> NewSyncLogEntry {
    let started_at = Utc::now();
    NewSyncLogEntry {
        tenant_id,
        integration_id,
        customer_id: None,
        provider_type: ProviderType::Mikrotik,
        action: SyncAction::TestConnection,
        status,
        request_snapshot: serde_json::json!({"action": "test_connection"}),
        response_snapshot: serde_json::json!({"success": status == SyncStatus::Success}),
        error_message: (status == SyncStatus::Failed).then(|| "timeout".to_string()),
        started_at,
        completed_at: started_at + Duration::milliseconds(40),
        duration_ms: 40,
        triggered_by: TriggerSource::Manual,
        triggered_by_user: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn schema_bootstraps(pool: PgPool) {
    ispsync_db::health_check(&pool).await.unwrap();

    for table in ["integrations", "integration_sync_logs", "customers", "packages", "tenant_memberships"] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn integrations_are_tenant_scoped(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let store = PgSyncStore::new(pool.clone());

    let found = store.find_integration(tenant, row.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Core router");
    assert_eq!(found.port, Some(8080));
    assert_eq!(found.encrypted_credentials, Some(vec![9, 9, 9]));

    let foreign = store.find_integration(DbId::new_v4(), row.id).await.unwrap();
    assert!(foreign.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn owning_tenant_is_visible_without_tenant_scope(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let store = PgSyncStore::new(pool.clone());

    assert_eq!(store.integration_tenant(row.id).await.unwrap(), Some(tenant));
    assert_eq!(store.integration_tenant(DbId::new_v4()).await.unwrap(), None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_keeps_credentials_unless_replaced(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let mut changes = IntegrationChanges {
        name: "Edge router".into(),
        config: ProviderConfig::Mikrotik(MikrotikConfig::default()),
        host: Some("203.0.113.2".into()),
        port: None,
        username: Some("api".into()),
        credentials: CredentialChange::Keep,
        sync_mode: SyncMode::Scheduled,
        sync_interval_minutes: Some(60),
        is_enabled: false,
    };

    let updated = IntegrationRepo::update(&pool, tenant, row.id, &changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Edge router");
    assert_eq!(updated.encrypted_credentials, Some(vec![9, 9, 9]));
    assert!(!updated.is_enabled);

    changes.credentials = CredentialChange::Clear;
    let cleared = IntegrationRepo::update(&pool, tenant, row.id, &changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.encrypted_credentials, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_cannot_change_provider_type(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let changes = IntegrationChanges {
        name: "AAA".into(),
        config: ProviderConfig::Radius(RadiusConfig {
            auth_port: 1812,
            acct_port: 1813,
            coa_port: 3799,
            secret: "s".into(),
        }),
        host: None,
        port: None,
        username: None,
        credentials: CredentialChange::Keep,
        sync_mode: SyncMode::Manual,
        sync_interval_minutes: None,
        is_enabled: true,
    };

    let result = IntegrationRepo::update(&pool, tenant, row.id, &changes).await.unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn later_started_attempt_wins_status_write(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let store = PgSyncStore::new(pool.clone());
    let earlier = Utc::now();
    let later = earlier + Duration::seconds(1);

    let newer = IntegrationSyncUpdate {
        integration_id: row.id,
        started_at: later,
        completed_at: later + Duration::milliseconds(10),
        status: SyncStatus::Success,
    };
    assert!(store.record_sync_result(&newer).await.unwrap());

    let stale = IntegrationSyncUpdate {
        integration_id: row.id,
        started_at: earlier,
        completed_at: later + Duration::seconds(5),
        status: SyncStatus::Failed,
    };
    assert!(!store.record_sync_result(&stale).await.unwrap());

    let integration = store.find_integration(tenant, row.id).await.unwrap().unwrap();
    assert_eq!(integration.last_sync_status, Some(SyncStatus::Success));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sync_logs_append_list_and_cascade(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let store = PgSyncStore::new(pool.clone());

    store.append(&log_entry(tenant, row.id, SyncStatus::Success)).await.unwrap();
    let failed_id = store.append(&log_entry(tenant, row.id, SyncStatus::Failed)).await.unwrap();

    let logs = SyncLogRepo::list_for_integration(&pool, tenant, row.id, 10, 0).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].id, failed_id);
    assert_eq!(logs[0].error_message.as_deref(), Some("timeout"));

    let other_tenant = SyncLogRepo::list_for_integration(&pool, DbId::new_v4(), row.id, 10, 0)
        .await
        .unwrap();
    assert!(other_tenant.is_empty());

    assert!(IntegrationRepo::delete(&pool, tenant, row.id).await.unwrap());
    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM integration_sync_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining.0, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sync_log_rows_are_immutable(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let id = SyncLogRepo::append(&pool, &log_entry(tenant, row.id, SyncStatus::Success))
        .await
        .unwrap();

    let result = sqlx::query("UPDATE integration_sync_logs SET status = 'failed' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failed_log_without_error_message_is_rejected(pool: PgPool) {
    let tenant = DbId::new_v4();
    let row = IntegrationRepo::create(&pool, &new_router(tenant)).await.unwrap();
    let mut entry = log_entry(tenant, row.id, SyncStatus::Failed);
    entry.error_message = None;

    assert!(SyncLogRepo::append(&pool, &entry).await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn customer_sync_projection_round_trips(pool: PgPool) {
    let tenant = DbId::new_v4();
    let (package_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO packages (tenant_id, name, speed_label) VALUES ($1, 'Home 30', '30 Mbps') RETURNING id",
    )
    .bind(tenant)
    .fetch_one(&pool)
    .await
    .unwrap();
    let (customer_id,): (DbId,) = sqlx::query_as(
        "INSERT INTO customers (tenant_id, name, network_username, connection_status, package_id)
         VALUES ($1, 'Ada', 'ada01', 'active', $2) RETURNING id",
    )
    .bind(tenant)
    .bind(package_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let store = PgSyncStore::new(pool.clone());

    let target = store.find_customer(tenant, customer_id).await.unwrap().unwrap();
    assert_eq!(target.network_username.as_deref(), Some("ada01"));
    assert_eq!(target.speed_label.as_deref(), Some("30 Mbps"));
    assert!(store.find_customer(DbId::new_v4(), customer_id).await.unwrap().is_none());

    store
        .record_customer_sync(customer_id, Utc::now(), SyncStatus::Success)
        .await
        .unwrap();
    let (status,): (Option<String>,) =
        sqlx::query_as("SELECT network_sync_status FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status.as_deref(), Some("success"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn access_gate_requires_membership(pool: PgPool) {
    let tenant = DbId::new_v4();
    let gate = PgAccessGate::new(pool.clone());
    let staff = Caller {
        user_id: DbId::new_v4(),
        tenant_id: Some(tenant),
        role: ROLE_STAFF.to_string(),
    };

    assert!(!gate.may_access_tenant(&staff, tenant).await.unwrap());

    TenantAccessRepo::grant(&pool, staff.user_id, tenant, ROLE_STAFF).await.unwrap();
    assert!(gate.may_access_tenant(&staff, tenant).await.unwrap());
    assert!(!gate.may_access_tenant(&staff, DbId::new_v4()).await.unwrap());

    let operator = Caller {
        user_id: DbId::new_v4(),
        tenant_id: None,
        role: ROLE_SUPER_ADMIN.to_string(),
    };
    assert!(gate.may_access_tenant(&operator, tenant).await.unwrap());
}
