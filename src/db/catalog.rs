use duckdb::Connection;
use std::path::Path;
use tracing::{debug, error};

/// Builds a textual snapshot of the live database catalog for LLM prompts.
///
/// Output format, one block per table:
///
/// ```text
/// Table: users
///   id: INTEGER
///   name: VARCHAR
/// ```
///
/// Returns an empty string when the database has no tables or the catalog
/// query fails; callers must treat empty as "cannot proceed".
pub fn build_schema_snapshot(db_path: &Path) -> String {
    let conn = match Connection::open(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return String::new();
        }
    };
    snapshot_with(&conn)
}

/// Snapshot against an already-open connection. The connection is shared for
/// all per-table describe queries and released by the caller.
pub fn snapshot_with(conn: &Connection) -> String {
    let tables = match list_tables(conn) {
        Ok(tables) => tables,
        Err(e) => {
            error!("Failed to list tables: {}", e);
            return String::new();
        }
    };

    if tables.is_empty() {
        debug!("No tables found in database catalog");
        return String::new();
    }

    let mut snapshot = String::new();
    for table in &tables {
        let columns = match describe_table(conn, table) {
            Ok(columns) => columns,
            Err(e) => {
                error!("Failed to describe table {}: {}", table, e);
                return String::new();
            }
        };

        snapshot.push_str(&format!("Table: {}\n", table));
        for (name, data_type) in &columns {
            snapshot.push_str(&format!("  {}: {}\n", name, data_type));
        }
        snapshot.push('\n');
    }

    snapshot.trim_end().to_string()
}

/// All user table names in the main schema, in catalog order.
pub fn list_tables(conn: &Connection) -> duckdb::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'main' ORDER BY table_name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(tables)
}

/// (column name, declared type) pairs for one table, in ordinal order.
pub fn describe_table(conn: &Connection, table: &str) -> duckdb::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map([table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<duckdb::Result<Vec<_>>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_of_empty_database_is_empty() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(snapshot_with(&conn), "");
    }

    #[test]
    fn snapshot_lists_tables_and_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER, name VARCHAR);
             CREATE TABLE orders (order_id INTEGER, amount DOUBLE);",
        )
        .unwrap();

        let snapshot = snapshot_with(&conn);
        assert!(snapshot.contains("Table: users"));
        assert!(snapshot.contains("  id: INTEGER"));
        assert!(snapshot.contains("Table: orders"));
        assert!(snapshot.contains("  amount: DOUBLE"));
        // Tables separated by a blank line, no trailing whitespace.
        assert!(snapshot.contains("\n\nTable:"));
        assert_eq!(snapshot, snapshot.trim_end());
    }

    #[test]
    fn snapshot_is_deterministic() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER, b VARCHAR);")
            .unwrap();
        assert_eq!(snapshot_with(&conn), snapshot_with(&conn));
    }
}
