//! CSV import of properties, tenants, leases and invoices, and the row
//! counts used to follow an import's progress.

mod entities;
mod mapping;
mod pipeline;
mod report;
mod stats;

pub use entities::EntityKind;
pub use mapping::{FieldKind, FieldSpec, Rule};
pub use pipeline::Migrator;
pub use report::{ErrorStage, MigrationResult, ValidationError};
pub use stats::{migration_stats, MigrationStats};
