use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::{Map, Number, Value};

use super::schema::{PHOTO_SCHEMA, SCHEMA, meta_columns, record_table_ddl};
use super::{RowPage, Store};
use crate::error::{Error, Result};
use crate::query::{Predicate, QuerySpec};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

/// `contains_ci(haystack, needle)`: true when `haystack` contains `needle`
/// after Unicode lowercasing of both. Non-text haystacks never match.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(contains_ci(ctx)),
    )
}

fn contains_ci(ctx: &Context<'_>) -> bool {
    let (ValueRef::Text(haystack), ValueRef::Text(needle)) = (ctx.get_raw(0), ctx.get_raw(1))
    else {
        return false;
    };
    let haystack = String::from_utf8_lossy(haystack).to_lowercase();
    let needle = String::from_utf8_lossy(needle).to_lowercase();
    haystack.contains(&needle)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed width so that text order is chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

fn check_column(table: RecordTable, column: &str) -> Result<()> {
    if meta_columns(table).contains(&column) || table.columns().contains(&column) {
        Ok(())
    } else {
        Err(Error::Query(format!(
            "column {table}.{column} does not exist"
        )))
    }
}

fn select_list(table: RecordTable) -> String {
    meta_columns(table)
        .iter()
        .chain(table.columns())
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Interprets the predicates of `spec`, in order, into a WHERE clause.
fn where_clause(spec: &QuerySpec) -> Result<(String, Vec<SqlValue>)> {
    let table = spec.table;
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    for predicate in &spec.predicates {
        match predicate {
            Predicate::Eq { column, value } => {
                check_column(table, column)?;
                clauses.push(format!("\"{column}\" = ?"));
                values.push(SqlValue::Text(value.clone()));
            }
            Predicate::Gte { column, value } => {
                check_column(table, column)?;
                clauses.push(format!("\"{column}\" >= ?"));
                values.push(SqlValue::Text(value.clone()));
            }
            Predicate::Lte { column, value } => {
                check_column(table, column)?;
                clauses.push(format!("\"{column}\" <= ?"));
                values.push(SqlValue::Text(value.clone()));
            }
            Predicate::AnyILike { columns, term } => {
                if columns.is_empty() {
                    clauses.push("0".to_string());
                    continue;
                }
                let mut alternatives = Vec::with_capacity(columns.len());
                for column in *columns {
                    check_column(table, column)?;
                    alternatives.push(format!("contains_ci(\"{column}\", ?)"));
                    values.push(SqlValue::Text(term.clone()));
                }
                clauses.push(format!("({})", alternatives.join(" OR ")));
            }
        }
    }

    if clauses.is_empty() {
        Ok((String::new(), values))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
    }
}

struct RawRecord {
    meta: RecordMeta,
    columns: Map<String, Value>,
}

impl RawRecord {
    fn read(row: &Row<'_>, table: RecordTable) -> rusqlite::Result<Self> {
        let meta = RecordMeta {
            id: row.get(0)?,
            formatted_id: row.get(1)?,
            created_at: parse_datetime(&row.get::<_, String>(2)?),
            created_by: row.get(3)?,
            business_unit: if table.is_scoped() { row.get(4)? } else { None },
        };

        let offset = meta_columns(table).len();
        let mut columns = Map::new();
        for (i, column) in table.columns().iter().enumerate() {
            columns.insert((*column).to_string(), sql_to_json(row.get_ref(offset + i)?));
        }

        Ok(Self { meta, columns })
    }

    fn into_record(self, table: RecordTable) -> Result<Record> {
        let fields = RecordFields::from_json(table, Value::Object(self.columns)).inspect_err(|e| {
            tracing::error!("Stored row {}.{} is invalid: {e}", table, self.meta.id);
        })?;
        Ok(Record {
            table,
            meta: self.meta,
            fields,
        })
    }
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn read_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
    })
}

fn read_photo(row: &Row<'_>) -> rusqlite::Result<IncidentPhoto> {
    Ok(IncidentPhoto {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        object_path: row.get(2)?,
        url: row.get(3)?,
        content_type: row.get(4)?,
        size_bytes: row.get(5)?,
        sha256: row.get(6)?,
        position: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const PHOTO_COLUMNS: &str =
    "id, incident_id, object_path, url, content_type, size_bytes, sha256, position, created_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        for table in RecordTable::ALL {
            conn.execute_batch(&record_table_ddl(table))?;
        }
        conn.execute_batch(PHOTO_SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id,
                user.email.to_lowercase(),
                user.password_hash,
                format_datetime(&user.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?1",
            params![id],
            read_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
            params![email.trim().to_lowercase()],
            read_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, email, password_hash, created_at FROM users ORDER BY email")?;
        let rows = stmt.query_map([], read_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Profile operations

    fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO profiles (user_id, business_unit, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                business_unit = excluded.business_unit,
                updated_at = excluded.updated_at",
            params![
                profile.user_id,
                profile.business_unit,
                format_datetime(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, business_unit, updated_at FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Profile {
                    user_id: row.get(0)?,
                    business_unit: row.get(1)?,
                    updated_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Session operations

    fn create_session(&self, session: &SessionRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.user_id,
                format_datetime(&session.created_at),
                session.expires_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            read_session,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Record operations

    fn select_records(&self, spec: &QuerySpec) -> Result<RowPage> {
        let table = spec.table;
        check_column(table, spec.order.column)?;
        let (where_sql, values) = where_clause(spec)?;

        let conn = self.conn();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{where_sql}", table.name()),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let direction = if spec.order.descending { "DESC" } else { "ASC" };
        let mut sql = format!(
            "SELECT {} FROM {}{where_sql} ORDER BY \"{}\" {direction}",
            select_list(table),
            table.name(),
            spec.order.column,
        );
        let mut values = values;
        if let Some(window) = spec.window {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(SqlValue::Integer(window.limit() as i64));
            values.push(SqlValue::Integer(window.offset() as i64));
        }

        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                RawRecord::read(row, table)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rows = raw
            .into_iter()
            .map(|r| r.into_record(table))
            .collect::<Result<Vec<_>>>()?;

        Ok(RowPage {
            rows,
            total: total as u64,
        })
    }

    fn get_record(&self, table: RecordTable, id: &str) -> Result<Option<Record>> {
        let raw = {
            let conn = self.conn();
            conn.query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    select_list(table),
                    table.name()
                ),
                params![id],
                |row| RawRecord::read(row, table),
            )
            .optional()?
        };

        raw.map(|r| r.into_record(table)).transpose()
    }

    fn insert_record(&self, record: &NewRecord) -> Result<Record> {
        let table = record.fields.table();
        let created_at = now();
        let business_unit = if table.is_scoped() {
            record.business_unit.clone()
        } else {
            None
        };
        let columns = record.fields.to_columns()?;

        let mut names = vec!["id", "formatted_id", "created_at", "created_by"];
        let mut values = vec![
            SqlValue::Text(record.id.clone()),
            SqlValue::Text(record.formatted_id.clone()),
            SqlValue::Text(format_datetime(&created_at)),
            SqlValue::Text(record.created_by.clone()),
        ];
        if table.is_scoped() {
            names.push("business_unit");
            values.push(business_unit.clone().map_or(SqlValue::Null, SqlValue::Text));
        }
        for (name, value) in &columns {
            names.push(name.as_str());
            values.push(json_to_sql(value));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; names.len()].join(", ")
        );
        self.conn().execute(&sql, params_from_iter(values.iter()))?;

        Ok(Record {
            table,
            meta: RecordMeta {
                id: record.id.clone(),
                formatted_id: record.formatted_id.clone(),
                created_at,
                created_by: record.created_by.clone(),
                business_unit,
            },
            fields: record.fields.clone(),
        })
    }

    fn update_record(
        &self,
        id: &str,
        formatted_id: &str,
        fields: &RecordFields,
    ) -> Result<Record> {
        let table = fields.table();
        let columns = fields.to_columns()?;

        let mut assignments = vec!["\"formatted_id\" = ?".to_string()];
        let mut values = vec![SqlValue::Text(formatted_id.to_string())];
        for (name, value) in &columns {
            assignments.push(format!("\"{name}\" = ?"));
            values.push(json_to_sql(value));
        }
        values.push(SqlValue::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table.name(),
            assignments.join(", ")
        );
        let rows = self.conn().execute(&sql, params_from_iter(values.iter()))?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        self.get_record(table, id)?.ok_or(Error::NotFound)
    }

    fn delete_record(&self, table: RecordTable, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.name()),
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Incident photo operations

    fn create_incident_photo(&self, photo: &IncidentPhoto) -> Result<()> {
        self.conn().execute(
            &format!("INSERT INTO incident_photos ({PHOTO_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                photo.id,
                photo.incident_id,
                photo.object_path,
                photo.url,
                photo.content_type,
                photo.size_bytes,
                photo.sha256,
                photo.position,
                format_datetime(&photo.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_incident_photo(&self, id: &str) -> Result<Option<IncidentPhoto>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PHOTO_COLUMNS} FROM incident_photos WHERE id = ?1"),
            params![id],
            read_photo,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_incident_photos(&self, incident_id: &str) -> Result<Vec<IncidentPhoto>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM incident_photos
             WHERE incident_id = ?1 ORDER BY position, created_at"
        ))?;
        let rows = stmt.query_map(params![incident_id], read_photo)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_incident_photo(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM incident_photos WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::query::RowWindow;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn mail_in(id: &str, sender: &str, unit: &str, day: u32) -> NewRecord {
        NewRecord {
            id: id.to_string(),
            formatted_id: format!("MAIL-IN-{id}"),
            created_by: "user-1".to_string(),
            business_unit: Some(unit.to_string()),
            fields: RecordFields::MailIn(MailIn {
                date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                sender: sender.to_string(),
                recipient: "Front desk".to_string(),
                courier: None,
                tracking_number: None,
                item_type: Some("parcel".to_string()),
                received_by: "guard".to_string(),
                remarks: None,
            }),
        }
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let store = store();
        let inserted = store.insert_record(&mail_in("a1", "DHL", "tst", 3)).unwrap();
        let fetched = store.get_record(RecordTable::MailIn, "a1").unwrap().unwrap();
        assert_eq!(inserted, fetched);
        assert_eq!(fetched.meta.business_unit.as_deref(), Some("tst"));
    }

    #[test]
    fn test_unscoped_table_drops_business_unit() {
        let store = store();
        let record = NewRecord {
            id: "m1".to_string(),
            formatted_id: "MOR-AAAAAA".to_string(),
            created_by: "user-1".to_string(),
            business_unit: Some("shipyard".to_string()),
            fields: RecordFields::MooringReport(MooringReport {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                vessel_name: "MV Example".to_string(),
                berth: "B2".to_string(),
                operation: "mooring".to_string(),
                tug_name: None,
                start_time: None,
                end_time: None,
                line_handlers: None,
                remarks: None,
            }),
        };
        let inserted = store.insert_record(&record).unwrap();
        assert_eq!(inserted.meta.business_unit, None);
    }

    #[test]
    fn test_predicates_and_window() {
        let store = store();
        store.insert_record(&mail_in("a1", "DHL Express", "tst", 1)).unwrap();
        store.insert_record(&mail_in("a2", "FedEx", "tst", 2)).unwrap();
        store.insert_record(&mail_in("a3", "dhl local", "TST", 3)).unwrap();
        store.insert_record(&mail_in("a4", "UPS", "shipyard", 4)).unwrap();

        let spec = QuerySpec::new(RecordTable::MailIn)
            .with(Predicate::Eq {
                column: "business_unit",
                value: "tst".to_string(),
            })
            .with(Predicate::AnyILike {
                columns: RecordTable::MailIn.search_columns(),
                term: "dhl".to_string(),
            });
        let page = store.select_records(&spec).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].id(), "a1");

        let spec = QuerySpec::new(RecordTable::MailIn)
            .with(Predicate::Gte {
                column: "date",
                value: "2025-01-02".to_string(),
            })
            .with(Predicate::Lte {
                column: "date",
                value: "2025-01-03".to_string(),
            });
        let page = store.select_records(&spec).unwrap();
        assert_eq!(page.total, 2);

        let spec = QuerySpec::new(RecordTable::MailIn).with_window(RowWindow { from: 0, to: 1 });
        let page = store.select_records(&spec).unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.rows.len(), 2);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let store = store();
        store.insert_record(&mail_in("a1", "100% Cotton", "tst", 1)).unwrap();
        store.insert_record(&mail_in("a2", "1000 Cotton", "tst", 1)).unwrap();

        let spec = QuerySpec::new(RecordTable::MailIn).with(Predicate::AnyILike {
            columns: &["sender"],
            term: "0%".to_string(),
        });
        let page = store.select_records(&spec).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].id(), "a1");
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let store = store();
        store.insert_record(&mail_in("a1", "Ünal Lojistik Ç", "tst", 1)).unwrap();
        store.insert_record(&mail_in("a2", "Unal Cargo", "tst", 1)).unwrap();

        for term in ["Ünal", "ünal", "lojistik ç"] {
            let spec = QuerySpec::new(RecordTable::MailIn).with(Predicate::AnyILike {
                columns: &["sender"],
                term: term.to_string(),
            });
            let page = store.select_records(&spec).unwrap();
            assert_eq!(page.total, 1, "{term}");
            assert_eq!(page.rows[0].id(), "a1");
        }
    }

    #[test]
    fn test_unknown_column_is_query_error() {
        let store = store();
        let spec = QuerySpec::new(RecordTable::MooringReport).with(Predicate::Eq {
            column: "business_unit",
            value: "tst".to_string(),
        });
        assert!(matches!(store.select_records(&spec), Err(Error::Query(_))));
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let store = store();
        let record = mail_in("a1", "DHL", "tst", 1);
        let result = store.update_record("missing", "MAIL-IN-X", &record.fields);
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let store = store();
        store
            .create_user(&User {
                id: "u1".to_string(),
                email: "Guard@Example.com".to_string(),
                password_hash: "hash".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        let user = store.get_user_by_email("guard@example.COM").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email, "guard@example.com");
    }
}
