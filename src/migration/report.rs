use serde::Serialize;

/// Where a row was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    /// Field-level checks failed; nothing was written.
    Validation,
    /// The backend rejected the insert.
    Insert,
}

/// A row that did not make it into the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// 1-based data row number (the header row is not counted).
    pub row: usize,
    pub subject: String,
    pub stage: ErrorStage,
    pub problems: Vec<String>,
}

/// Outcome of importing one file.
///
/// Every data row read counts toward `total`, so
/// `total == succeeded + failed` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub errors: Vec<ValidationError>,
}

impl MigrationResult {
    pub(crate) fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(
        &mut self,
        row: usize,
        subject: String,
        stage: ErrorStage,
        problems: Vec<String>,
    ) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(ValidationError {
            row,
            subject,
            stage,
            problems,
        });
    }

    /// Rows rejected before reaching the database.
    pub fn rejected(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| e.stage == ErrorStage::Validation)
            .count()
    }
}
