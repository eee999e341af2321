use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use super::entities::EntityKind;
use super::mapping::{map_record, HeaderIndex, MappedRecord};
use super::report::{ErrorStage, MigrationResult};
use crate::error::{PropDbError, Result};
use crate::gateway::Gateway;

/// Imports CSV files through a [`Gateway`], one row at a time.
///
/// Each row is mapped, validated and (if valid) inserted before the next
/// one is read. A failed insert is recorded and skipped; earlier rows stay
/// committed. Importing the same file twice inserts its rows twice.
pub struct Migrator<'a> {
    gateway: &'a Gateway,
}

impl<'a> Migrator<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Import the CSV file at `path` as records of `kind`.
    ///
    /// The file is read into memory in one go (uploads are capped at 10 MB)
    /// and its rows are then processed one at a time. A failed read yields
    /// [`PropDbError::Stream`] with an empty partial result, since no row has
    /// been handled yet; a malformed row yields the same error carrying
    /// whatever was imported before it.
    pub async fn migrate_file(&self, kind: EntityKind, path: &Path) -> Result<MigrationResult> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            stream_error(
                format!("{}: {}", path.display(), e),
                MigrationResult::default(),
            )
        })?;
        self.migrate_bytes(kind, &bytes).await
    }

    /// Import CSV content already held in memory.
    pub async fn migrate_bytes(&self, kind: EntityKind, bytes: &[u8]) -> Result<MigrationResult> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let mut result = MigrationResult::default();
        let headers = match reader.headers() {
            Ok(headers) => HeaderIndex::new(headers),
            Err(e) => return Err(stream_error(e.to_string(), result)),
        };

        let mut record = StringRecord::new();
        let mut row = 0;
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(%kind, row = row + 1, error = %e, "CSV stream failed");
                    return Err(stream_error(e.to_string(), result));
                }
            }
            row += 1;

            let mapped = map_record(kind.fields(), &headers, &record);
            let subject = kind.subject(&mapped, row);

            if !mapped.is_valid() {
                warn!(%kind, row, %subject, problems = ?mapped.problems, "Row rejected");
                result.record_failure(row, subject, ErrorStage::Validation, mapped.problems);
                continue;
            }

            match self.insert(kind, mapped).await {
                Ok(()) => {
                    debug!(%kind, row, %subject, "Row imported");
                    result.record_success();
                }
                Err(e) => {
                    warn!(%kind, row, %subject, error = %e, "Row insert failed");
                    result.record_failure(row, subject, ErrorStage::Insert, vec![e.to_string()]);
                }
            }
        }

        info!(
            %kind,
            succeeded = result.succeeded,
            failed = result.failed,
            total = result.total,
            "Migration completed"
        );
        Ok(result)
    }

    async fn insert(&self, kind: EntityKind, record: MappedRecord) -> Result<()> {
        let mut values = record.values.into_iter();
        let Some((column, value)) = values.next() else {
            return Err(PropDbError::UnsupportedStatement(format!(
                "no columns mapped for {}",
                kind
            )));
        };

        let insert = values.fold(
            self.gateway.insert_into(kind.table()).value(column, value),
            |insert, (column, value)| insert.value(column, value),
        );
        insert.execute().await?;
        Ok(())
    }
}

fn stream_error(message: String, partial: MigrationResult) -> PropDbError {
    PropDbError::Stream {
        message,
        partial: Box::new(partial),
    }
}
