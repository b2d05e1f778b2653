use sqlx::FromRow;

use ispsync_core::customer::CustomerSyncTarget;
use ispsync_core::types::DbId;

/// A customer joined with its package, as the sync engine reads it.
#[derive(Debug, Clone, FromRow)]
pub struct CustomerSyncRow {
    pub id: DbId,
    pub name: String,
    pub network_username: Option<String>,
    pub connection_status: Option<String>,
    pub package_name: Option<String>,
    pub speed_label: Option<String>,
}

impl From<CustomerSyncRow> for CustomerSyncTarget {
    fn from(row: CustomerSyncRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            network_username: row.network_username,
            connection_status: row.connection_status,
            package_name: row.package_name,
            speed_label: row.speed_label,
        }
    }
}
