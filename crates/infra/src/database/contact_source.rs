//! SQLite-backed implementation of the `ContactSource` port.
//!
//! Column values are typed from the declared column type: date and time
//! columns become UTC timestamps, `bit`/`boolean` columns become bits, and
//! everything else keeps its storage class. Incremental filters compare
//! normalized `datetime()` values so text, ISO-8601 and unix-second columns
//! all order correctly against the last run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mailsync_core::ContactSource;
use mailsync_domain::{
    ColumnInfo, ColumnValue, ContactRecord, MailsyncError, Result as DomainResult, RowFilter,
};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tokio::task;
use tracing::debug;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Format of the bound comparison value; matches `datetime(.., 'subsec')`.
const SINCE_PARAM_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const NAIVE_TIMESTAMP_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Read-only contact rows from a SQLite table or view
pub struct SqliteContactSource {
    db: Arc<DbManager>,
}

impl SqliteContactSource {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactSource for SqliteContactSource {
    async fn list_columns(&self, table: &str) -> DomainResult<Vec<ColumnInfo>> {
        let db = Arc::clone(&self.db);
        let table = table.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<ColumnInfo>> {
            let conn = db.get_connection()?;
            load_columns(&conn, &table)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn query_rows(
        &self,
        table: &str,
        filter: &RowFilter,
    ) -> DomainResult<Vec<ContactRecord>> {
        let db = Arc::clone(&self.db);
        let table = table.to_string();
        let filter = filter.clone();

        task::spawn_blocking(move || -> DomainResult<Vec<ContactRecord>> {
            let conn = db.get_connection()?;
            let columns = load_columns(&conn, &table)?;
            let (sql, since) = select_sql(&conn, &table, &filter)?;
            debug!(%table, %sql, "Querying contact rows");

            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let bound: Vec<&dyn ToSql> = since.iter().map(|s| s as &dyn ToSql).collect();
            let mut rows = stmt.query(bound.as_slice()).map_err(map_sql_error)?;

            let mut records = Vec::new();
            while let Some(row) = rows.next().map_err(map_sql_error)? {
                let mut record = ContactRecord::new();
                for (index, column) in columns.iter().enumerate() {
                    let raw = row.get_ref(index).map_err(map_sql_error)?;
                    record.insert(column.name.clone(), typed_value(raw, &column.declared_type));
                }
                records.push(record);
            }
            Ok(records)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn load_columns(conn: &Connection, table: &str) -> DomainResult<Vec<ColumnInfo>> {
    let mut stmt = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(map_sql_error)?;
    let columns = stmt
        .query_map(params![table], |row| {
            let name: String = row.get(0)?;
            let declared: String = row.get(1)?;
            Ok(ColumnInfo::new(name, declared.to_lowercase()))
        })
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;

    if columns.is_empty() {
        return Err(MailsyncError::Config(format!("source table or view '{table}' not found")));
    }
    Ok(columns)
}

/// Build the SELECT for `filter`; returns the SQL and the optional bound
/// comparison value.
fn select_sql(
    conn: &Connection,
    table: &str,
    filter: &RowFilter,
) -> DomainResult<(String, Option<String>)> {
    let mut sql = format!("SELECT * FROM {}", quote_identifier(table));
    let mut since_param = None;

    if let RowFilter::AnySinceAfter { columns, since } = filter {
        let predicates: Vec<String> = columns
            .iter()
            .map(|column| {
                let column = quote_identifier(column);
                format!(
                    "(CASE typeof({column}) WHEN 'integer' THEN datetime({column}, 'unixepoch', 'subsec') \
                     ELSE datetime({column}, 'subsec') END) > ?1"
                )
            })
            .collect();
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" OR "));
            since_param = Some(since.format(SINCE_PARAM_FORMAT).to_string());
        }
    }

    if is_table(conn, table)? {
        sql.push_str(" ORDER BY rowid");
    }
    Ok((sql, since_param))
}

fn is_table(conn: &Connection, name: &str) -> DomainResult<bool> {
    let kind: Option<String> = conn
        .query_row("SELECT type FROM sqlite_master WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(map_sql_error)?;
    Ok(kind.as_deref() == Some("table"))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn typed_value(raw: ValueRef<'_>, declared_type: &str) -> ColumnValue {
    let declared = declared_type.trim();
    let is_temporal =
        declared.starts_with("datetime") || declared.starts_with("timestamp") || declared == "date";
    let is_bit = declared.starts_with("bit") || declared.starts_with("bool");

    match raw {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(i) if is_temporal => DateTime::from_timestamp(i, 0)
            .map(ColumnValue::Timestamp)
            .unwrap_or(ColumnValue::Integer(i)),
        ValueRef::Integer(i) if is_bit => ColumnValue::Bit(i != 0),
        ValueRef::Integer(i) => ColumnValue::Integer(i),
        ValueRef::Real(r) => ColumnValue::Real(r),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if is_temporal {
                if let Some(ts) = parse_timestamp(&text) {
                    return ColumnValue::Timestamp(ts);
                }
            }
            if is_bit {
                let trimmed = text.trim();
                if trimmed == "1" || trimmed.eq_ignore_ascii_case("true") {
                    return ColumnValue::Bit(true);
                }
                if trimmed == "0" || trimmed.eq_ignore_ascii_case("false") {
                    return ColumnValue::Bit(false);
                }
            }
            ColumnValue::Text(text)
        }
    }
}

/// Parse the timestamp spellings SQLite databases commonly hold, as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
