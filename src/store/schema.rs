use crate::types::RecordTable;

pub const SCHEMA: &str = r#"
-- Accounts that can sign in
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,       -- stored lower-cased
    password_hash TEXT NOT NULL,      -- argon2id hash with embedded salt
    created_at TEXT DEFAULT (datetime('now'))
);

-- One profile per user; business_unit scopes what the user may see
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    business_unit TEXT,               -- NULL = unset, 'master' = unrestricted
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Signed-in sessions; the raw bearer token is never stored
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    token_lookup TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT                   -- NULL = never
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;

/// Photos attached to incident reports. Created after the record tables so the
/// foreign key target exists.
pub const PHOTO_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS incident_photos (
    id TEXT PRIMARY KEY,
    incident_id TEXT NOT NULL REFERENCES incident_reports(id) ON DELETE CASCADE,
    object_path TEXT NOT NULL,
    url TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_incident_photos_incident ON incident_photos(incident_id);
"#;

/// Columns every record table starts with, in select order.
#[must_use]
pub fn meta_columns(table: RecordTable) -> &'static [&'static str] {
    if table.is_scoped() {
        &["id", "formatted_id", "created_at", "created_by", "business_unit"]
    } else {
        &["id", "formatted_id", "created_at", "created_by"]
    }
}

/// DDL for one record table. Form columns are declared without a type so
/// SQLite keeps text as text and numbers as numbers.
#[must_use]
pub fn record_table_ddl(table: RecordTable) -> String {
    let name = table.name();
    let mut columns = vec![
        "    id TEXT PRIMARY KEY".to_string(),
        "    formatted_id TEXT NOT NULL".to_string(),
        "    created_at TEXT NOT NULL".to_string(),
        "    created_by TEXT NOT NULL".to_string(),
    ];
    if table.is_scoped() {
        columns.push("    business_unit TEXT".to_string());
    }
    for column in table.columns() {
        columns.push(format!("    \"{column}\""));
    }

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {name} (\n{}\n);\n\
         CREATE INDEX IF NOT EXISTS idx_{name}_created ON {name}(created_at);\n",
        columns.join(",\n")
    );
    if table.is_scoped() {
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{name}_unit ON {name}(business_unit);\n"
        ));
    }
    ddl
}
