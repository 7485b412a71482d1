use std::path::Path;

use chrono::Utc;
use rusqlite::types::{Null, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params, params_from_iter};
use tracing::info;

use crate::error::Result;

/// One warehouse value. The report tables only ever hold integers, text and
/// gaps, so that is all the sink supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Int(i64),
    Text(String),
    Null,
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<u64> for Cell {
    fn from(v: u64) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Int(i64::from(v))
    }
}

impl From<Option<&str>> for Cell {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Cell::Null, Cell::from)
    }
}

impl From<Option<u32>> for Cell {
    fn from(v: Option<u32>) -> Self {
        v.map_or(Cell::Null, Cell::from)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Int(v) => ToSqlOutput::from(*v),
            Cell::Text(v) => ToSqlOutput::from(v.as_str()),
            Cell::Null => ToSqlOutput::from(Null),
        })
    }
}

/// Column-named tabular data, the unit the sink writes and the source reads.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Durable store for the report tables. Tables are created on first load with
/// a schema inferred from the rows; reads run plain SQL.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Append `table`'s rows under `name`, creating the table if needed.
    /// The whole load commits or rolls back as one unit; loads of different
    /// tables are independent of each other.
    pub fn load(&mut self, name: &str, table: &Table) -> Result<()> {
        let tx = self.conn.transaction()?;

        let column_defs: Vec<String> = table
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| format!("{col} {}", column_type(table, idx)))
            .collect();
        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {name} ({})",
                column_defs.join(", ")
            ),
            [],
        )?;

        {
            let placeholders: Vec<String> =
                (1..=table.columns.len()).map(|i| format!("?{i}")).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {name} ({}) VALUES ({})",
                table.columns.join(", "),
                placeholders.join(", ")
            ))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }

        tx.execute(
            "INSERT INTO load_runs(table_name, row_count, loaded_at) VALUES (?1, ?2, ?3)",
            params![name, table.rows.len() as i64, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(table = name, rows = table.rows.len(), "loaded table");
        Ok(())
    }

    pub fn query(&self, sql: &str) -> Result<Table> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(match row.get_ref(idx)? {
                    ValueRef::Null => Cell::Null,
                    ValueRef::Integer(v) => Cell::Int(v),
                    ValueRef::Real(v) => Cell::Text(v.to_string()),
                    ValueRef::Text(v) => Cell::Text(String::from_utf8_lossy(v).into_owned()),
                    ValueRef::Blob(_) => Cell::Null,
                });
            }
            out.push(cells);
        }
        Ok(Table {
            columns,
            rows: out,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS load_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            loaded_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// INTEGER or TEXT from the first non-null cell of the column; a column of
/// nothing but gaps stores as TEXT.
fn column_type(table: &Table, idx: usize) -> &'static str {
    for row in &table.rows {
        match row.get(idx) {
            Some(Cell::Int(_)) => return "INTEGER",
            Some(Cell::Text(_)) => return "TEXT",
            _ => {}
        }
    }
    "TEXT"
}
