use crate::db::row::{ResultSet, Scalar};
use duckdb::Connection;
use std::path::Path;
use tracing::{debug, error, info};

/// Outcome of running one SQL statement.
///
/// Row-returning statements yield `Rows` (an empty result set is still
/// `Rows`, distinct from failure). Write/DDL statements yield `Write`.
/// Any driver error is caught at this boundary and reported as `Failed`
/// with the driver's message; nothing propagates past the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Write,
    Failed(String),
}

/// Statements are classified by leading keyword: `SELECT` reads rows,
/// everything else executes as a side-effecting write.
pub fn is_read_statement(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

/// Runs one statement against the database at `db_path` on a fresh
/// connection, released on every exit path.
pub fn execute(db_path: &Path, sql: &str) -> QueryOutcome {
    let conn = match Connection::open(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return QueryOutcome::Failed(format!("database connection error: {}", e));
        }
    };
    execute_with(&conn, sql)
}

/// Runs one statement on an existing connection.
pub fn execute_with(conn: &Connection, sql: &str) -> QueryOutcome {
    if is_read_statement(sql) {
        read_rows(conn, sql)
    } else {
        match conn.execute_batch(sql) {
            Ok(()) => {
                info!("Write statement executed successfully");
                QueryOutcome::Write
            }
            Err(e) => {
                error!("Write statement failed: {}", e);
                QueryOutcome::Failed(e.to_string())
            }
        }
    }
}

fn read_rows(conn: &Connection, sql: &str) -> QueryOutcome {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            error!("Failed to prepare query: {}", e);
            return QueryOutcome::Failed(e.to_string());
        }
    };

    match fetch_all(&mut stmt) {
        Ok(result) => {
            debug!("Query returned {} rows", result.row_count());
            QueryOutcome::Rows(result)
        }
        Err(e) => {
            error!("Query execution failed: {}", e);
            QueryOutcome::Failed(e.to_string())
        }
    }
}

fn fetch_all(stmt: &mut duckdb::Statement<'_>) -> duckdb::Result<ResultSet> {
    // Column names must be read off the prepared statement before query()
    // takes the mutable borrow.
    let column_count = stmt.column_count();
    let mut column_names = Vec::with_capacity(column_count);
    for i in 0..column_count {
        match stmt.column_name(i) {
            Ok(name) => column_names.push(name.to_string()),
            Err(_) => column_names.push(format!("col{}", i)),
        }
    }

    let mut rows = stmt.query([])?;
    let mut data: Vec<Vec<Scalar>> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(column_count);
        for i in 0..column_count {
            cells.push(Scalar::from_value_ref(row.get_ref(i)?));
        }
        data.push(cells);
    }

    Ok(ResultSet::new(column_names, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE staff (dept VARCHAR, headcount INTEGER);
             INSERT INTO staff VALUES ('Eng', 5), ('Sales', 3);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn classifies_statements_by_prefix() {
        assert!(is_read_statement("SELECT 1"));
        assert!(is_read_statement("  select * from t"));
        assert!(!is_read_statement("INSERT INTO t VALUES (1)"));
        assert!(!is_read_statement("CREATE TABLE t (a INTEGER)"));
        assert!(!is_read_statement("UPDATE t SET a = 1"));
    }

    #[test]
    fn select_returns_rows_in_order() {
        let conn = seeded_conn();
        match execute_with(&conn, "SELECT dept, headcount FROM staff ORDER BY headcount DESC") {
            QueryOutcome::Rows(rs) => {
                assert_eq!(rs.columns, vec!["dept", "headcount"]);
                assert_eq!(rs.rows.len(), 2);
                assert_eq!(rs.rows[0][0], Scalar::Text("Eng".into()));
                assert_eq!(rs.rows[0][1], Scalar::Int(5));
                assert_eq!(rs.rows[1][0], Scalar::Text("Sales".into()));
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn empty_result_is_rows_not_failure() {
        let conn = seeded_conn();
        match execute_with(&conn, "SELECT dept FROM staff WHERE headcount > 100") {
            QueryOutcome::Rows(rs) => assert!(rs.is_empty()),
            other => panic!("expected empty rows, got {:?}", other),
        }
    }

    #[test]
    fn writes_return_write_outcome() {
        let conn = seeded_conn();
        let outcome = execute_with(&conn, "INSERT INTO staff VALUES ('Ops', 2)");
        assert_eq!(outcome, QueryOutcome::Write);

        match execute_with(&conn, "SELECT COUNT(*) AS n FROM staff") {
            QueryOutcome::Rows(rs) => assert_eq!(rs.rows[0][0], Scalar::Int(3)),
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn errors_surface_as_failed_with_message() {
        let conn = seeded_conn();
        match execute_with(&conn, "SELECT nope FROM missing_table") {
            QueryOutcome::Failed(msg) => assert!(!msg.is_empty()),
            other => panic!("expected failure, got {:?}", other),
        }
        match execute_with(&conn, "DROP TABLE missing_table") {
            QueryOutcome::Failed(msg) => assert!(!msg.is_empty()),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn null_cells_become_null_scalars() {
        let conn = seeded_conn();
        match execute_with(&conn, "SELECT NULL AS v, 1.5 AS f") {
            QueryOutcome::Rows(rs) => {
                assert_eq!(rs.rows[0][0], Scalar::Null);
                assert_eq!(rs.rows[0][1], Scalar::Float(1.5));
            }
            other => panic!("expected rows, got {:?}", other),
        }
    }
}
