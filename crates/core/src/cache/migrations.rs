//! Schema versioning for the response cache.
//!
//! Applied versions are recorded in `_migrations`; a fresh database gets
//! every script, an existing one only those above its recorded version.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

/// Ordered `(version, script)` pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_response_cache.sql"))];

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns `Error::Database` if a script fails; earlier scripts stay applied.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        let applied = schema_version(conn)?;
        for &(version, script) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            conn.execute_batch(script)?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tracing::debug!(version, "applied cache migration");
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
}
