//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce foreign keys.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// Reader connections used when `[storage] read_connections` is unset.
pub const DEFAULT_READ_CONNECTIONS: u32 = 8;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool for the list queries.
/// - `writer`: Single connection, so appends to a conversation are serialized
///   and the timestamp clamp in the repository sees the latest row.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database, apply pending migrations on the writer, then open
    /// `read_connections` reader connections (at least one).
    pub async fn new(database_url: &str, read_connections: u32) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts.clone())
            .await?;

        // Readers open read-only, so the schema must exist first.
        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&writer).await?;

        let read_connections = read_connections.max(1);
        let reader = SqlitePoolOptions::new()
            .max_connections(read_connections)
            .connect_with(base_opts.read_only(true))
            .await?;

        debug!(
            migrations = migrator.iter().count(),
            read_connections,
            "Conversation database ready"
        );

        Ok(Self { reader, writer })
    }
}

/// `sqlite://{data_dir}/chatline.db?mode=rwc`
pub fn default_database_url(data_dir: &Path) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        data_dir.join("chatline.db").display()
    )
}
