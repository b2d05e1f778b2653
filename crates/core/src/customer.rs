//! Customer view consumed by the sync engine.
//!
//! Customers are owned by the billing side of the platform; the sync engine
//! only reads the handful of fields a provider needs and writes back the
//! last-sync projection.

use serde::Serialize;

use crate::types::DbId;

/// Minimal customer projection handed to provider adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSyncTarget {
    pub id: DbId,
    pub name: String,
    /// PPP / RADIUS login. Absence is a defined failure for every
    /// state-changing action.
    pub network_username: Option<String>,
    pub connection_status: Option<String>,
    pub package_name: Option<String>,
    /// Human speed label of the package, e.g. `"30 Mbps"`.
    pub speed_label: Option<String>,
}

impl CustomerSyncTarget {
    /// The network username, ignoring blank values.
    pub fn network_username(&self) -> Option<&str> {
        self.network_username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}
