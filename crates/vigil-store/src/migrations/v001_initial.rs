//! v001 -- Initial schema creation.
//!
//! Creates the `kv_store` table: one row per fixed application key, holding
//! a whole serialized value.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,              -- whole serialized value (JSON)
    updated_at TEXT NOT NULL               -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
