//! propdb - dual-dialect persistence for property-management data
//!
//! Application code writes PostgreSQL-dialect statements once and runs them
//! against either a PostgreSQL server or an embedded SQLite file. On SQLite
//! the statements are translated first (see [`dialect`]); every backend
//! returns the same [`ExecutionResult`].
//!
//! # Example
//! ```ignore
//! use propdb::{DatabaseConfig, Gateway, QuerySpec};
//! use propdb::migration::{EntityKind, Migrator};
//!
//! let gateway = Gateway::connect(&DatabaseConfig::from_env()?).await?;
//! gateway.apply_schema().await?;
//!
//! let occupied = gateway
//!     .execute(
//!         &QuerySpec::new(
//!             "SELECT COUNT(*) FILTER (WHERE status = 'occupied') AS occupied \
//!              FROM units WHERE property_id = $1",
//!         )
//!         .bind(1),
//!     )
//!     .await?
//!     .single_row()?
//!     .get_i64("occupied")?;
//!
//! let report = Migrator::new(&gateway)
//!     .migrate_file(EntityKind::Property, "properties.csv".as_ref())
//!     .await?;
//!
//! gateway.close().await;
//! ```

pub mod builders;
pub mod config;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod migration;
pub mod schema;
pub mod traits;
pub mod types;

mod gateway;

// Re-export main types for convenient access
pub use config::{DatabaseConfig, EmbeddedConfig, ServerConfig};
pub use dialect::{translate, Dialect, TranslationError, TranslationResult};
pub use error::{PropDbError, Result};
pub use executor::StatementExecutor;
pub use gateway::Gateway;
pub use traits::DatabaseDriver;
pub use types::{Command, ExecutionResult, QuerySpec, RawQueryResult, Row, SqlValue};
