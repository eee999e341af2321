use serde::Serialize;

use crate::error::Result;
use crate::gateway::Gateway;

const STATS_QUERY: &str = "SELECT \
    (SELECT COUNT(*) FROM properties) AS properties, \
    (SELECT COUNT(*) FROM tenants) AS tenants, \
    (SELECT COUNT(*) FROM units) AS units, \
    (SELECT COUNT(*) FROM leases) AS leases, \
    (SELECT COUNT(*) FROM invoices) AS invoices, \
    (SELECT COUNT(*) FROM payments) AS payments";

/// Current row counts per entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub properties: i64,
    pub tenants: i64,
    pub units: i64,
    pub leases: i64,
    pub invoices: i64,
    pub payments: i64,
}

/// Count rows in every entity table with one read-only query. Not cached.
pub async fn migration_stats(gateway: &Gateway) -> Result<MigrationStats> {
    let row = gateway.query(STATS_QUERY, Vec::new()).await?.single_row()?;
    Ok(MigrationStats {
        properties: row.get_i64("properties")?,
        tenants: row.get_i64("tenants")?,
        units: row.get_i64("units")?,
        leases: row.get_i64("leases")?,
        invoices: row.get_i64("invoices")?,
        payments: row.get_i64("payments")?,
    })
}
