use crate::errors::QueryError;
use crate::models::{ResultTable, Value, Warning};
use rusqlite::{Connection, OpenFlags};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{debug, error};

/// Read-only handle on the backing SQLite file, opened once at startup.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, QueryError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub async fn fetch(&self, query: &str) -> Result<ResultTable, QueryError> {
        let conn = Arc::clone(&self.conn);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| QueryError::Poisoned)?;
            query_table(&conn, &query)
        })
        .await
        .map_err(|err| QueryError::Join(err.to_string()))?
    }
}

fn query_table(conn: &Connection, query: &str) -> Result<ResultTable, QueryError> {
    let mut statement = conn.prepare(query)?;
    if !statement.readonly() {
        return Err(QueryError::NotReadOnly(query.to_string()));
    }

    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();

    let rows = statement
        .query_map([], |row| {
            (0..width)
                .map(|index| row.get::<usize, rusqlite::types::Value>(index).map(Value::from))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = rows.len(), "fetched `{query}`");
    Ok(ResultTable::new(columns, rows))
}

/// Fetches `query`, turning any failure into an empty table plus a visible warning.
pub async fn load_table(db: &Database, query: &str) -> (ResultTable, Option<Warning>) {
    match db.fetch(query).await {
        Ok(table) => (table, None),
        Err(err) => {
            error!("failed to load `{query}`: {err}");
            (ResultTable::default(), Some(Warning::query(err)))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarningKind;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = fixtures::database_at(&dir.path().join("huella.db"));
        (dir, db)
    }

    #[tokio::test]
    async fn fetch_returns_columns_and_typed_rows() {
        let (_dir, db) = test_db();
        let table = db
            .fetch("SELECT * FROM cocina_eficiencia_huella")
            .await
            .unwrap();

        assert_eq!(table.columns, vec!["IDPersona", "ElementoCocina", "Eficiencia"]);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows[0],
            vec![Value::Integer(1), Value::from("Refrigerator"), Value::Real(0.8)]
        );
    }

    #[tokio::test]
    async fn fetch_rejects_writes() {
        let (_dir, db) = test_db();
        let err = db
            .fetch("DELETE FROM cocina_eficiencia_huella")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotReadOnly(_)));
    }

    #[tokio::test]
    async fn load_table_recovers_from_missing_table() {
        let (_dir, db) = test_db();
        let (table, warning) = load_table(&db, "SELECT * FROM no_such_table").await;

        assert!(table.is_empty());
        assert!(table.columns.is_empty());
        let warning = warning.expect("missing warning");
        assert_eq!(warning.kind, WarningKind::Query);
        assert!(warning.message.contains("no_such_table"));
    }

    #[test]
    fn open_fails_for_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(Database::open(&dir.path().join("absent.db")).is_err());
    }
}
