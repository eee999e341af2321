mod in_memory_test;
mod sqlite;
mod tokio_postgres;

pub use self::in_memory_test::{
    CallKind, InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery,
};
pub use self::sqlite::{SqliteDriver, IN_MEMORY};
pub use self::tokio_postgres::TokioPostgresDriver;
