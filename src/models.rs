use crate::chart::{BarChart, ChartSpec};
use crate::views::ViewId;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single cell as read from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Total order used for grouping: nulls, then numbers, then text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Integer(_) | Value::Real(_) => 1,
                Value::Text(_) => 2,
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let (a, b) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                a.total_cmp(&b)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Lenient numeric conversion: numbers pass through, text is parsed, everything else is null.
    pub fn to_numeric(&self) -> Value {
        match self {
            Value::Integer(_) | Value::Real(_) => self.clone(),
            Value::Text(text) => {
                let text = text.trim();
                if let Ok(value) = text.parse::<i64>() {
                    Value::Integer(value)
                } else {
                    match text.parse::<f64>() {
                        Ok(value) if value.is_finite() => Value::Real(value),
                        _ => Value::Null,
                    }
                }
            }
            Value::Null => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Real(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
        }
    }
}

impl From<rusqlite::types::Value> for Value {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value as Sql;
        match value {
            Sql::Null => Value::Null,
            Sql::Integer(value) => Value::Integer(value),
            Sql::Real(value) => Value::Real(value),
            Sql::Text(value) => Value::Text(value),
            Sql::Blob(bytes) => Value::Text(format!("<{} bytes>", bytes.len())),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

/// Rows materialized from one query, in the order the store returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Returns the rows matching `criterion` as a new table; `self` is left untouched.
    pub fn filter(&self, criterion: &FilterCriterion) -> ResultTable {
        let rows = match self.column_index(&criterion.column) {
            Some(index) => self
                .rows
                .iter()
                .filter(|row| row.get(index).is_some_and(|cell| criterion.matches(cell)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        ResultTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> ResultTable {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == column) {
                *column = (*to).to_string();
            }
        }
        self
    }

    /// Converts `column` in place with [`Value::to_numeric`]. A missing column is a no-op.
    pub fn coerce_numeric(mut self, column: &str) -> ResultTable {
        if let Some(index) = self.column_index(column) {
            for row in &mut self.rows {
                if let Some(cell) = row.get_mut(index) {
                    *cell = cell.to_numeric();
                }
            }
        }
        self
    }

    /// Distinct values of `column`, in first-seen order.
    pub fn distinct(&self, column: &str) -> Vec<Value> {
        let Some(index) = self.column_index(column) else {
            return Vec::new();
        };

        let mut seen: Vec<Value> = Vec::new();
        for row in &self.rows {
            if let Some(cell) = row.get(index) {
                if !seen.contains(cell) {
                    seen.push(cell.clone());
                }
            }
        }
        seen
    }
}

/// Equality predicate `column = literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriterion {
    pub column: String,
    pub literal: Value,
}

impl FilterCriterion {
    pub fn new(column: impl Into<String>, literal: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            literal: literal.into(),
        }
    }

    pub fn matches(&self, cell: &Value) -> bool {
        match (&self.literal, cell) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(a), Value::Real(b)) | (Value::Real(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Real(a), Value::Real(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Query,
    Chart,
}

/// A recovered failure shown inline on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn query(message: impl fmt::Display) -> Self {
        Self {
            kind: WarningKind::Query,
            message: format!("Error al cargar los datos: {message}"),
        }
    }

    pub fn chart(message: impl fmt::Display) -> Self {
        Self {
            kind: WarningKind::Chart,
            message: format!("Error al procesar el gráfico: {message}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViewSummary {
    pub slug: &'static str,
    pub label: &'static str,
}

/// Everything one render pass produces for the selected view.
#[derive(Debug, Serialize)]
pub struct ViewOutput {
    pub view: ViewId,
    pub label: &'static str,
    pub header: &'static str,
    pub table_title: Option<&'static str>,
    pub chart_title: Option<&'static str>,
    pub filter: Option<String>,
    pub table: ResultTable,
    pub aggregate: Option<ResultTable>,
    pub chart_spec: ChartSpec,
    pub chart: Option<BarChart>,
    pub warnings: Vec<Warning>,
    pub rendered_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> ResultTable {
        ResultTable::new(
            vec!["IDPersona".into(), "ElementoCocina".into()],
            vec![
                vec![Value::Integer(1), "Refrigerator".into()],
                vec![Value::Integer(2), "Refrigerator".into()],
                vec![Value::Real(2.0), "Stove".into()],
                vec![Value::Text("2".into()), "Oven".into()],
            ],
        )
    }

    #[test]
    fn integer_filter_matches_whole_floats_but_not_text() {
        let table = people();
        let filtered = table.filter(&FilterCriterion::new("IDPersona", 2i64));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.columns, table.columns);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn filter_on_absent_value_or_column_is_empty() {
        let table = people();
        assert!(table.filter(&FilterCriterion::new("IDPersona", 99i64)).is_empty());
        assert!(table.filter(&FilterCriterion::new("Sex", "male")).is_empty());
    }

    #[test]
    fn coerce_numeric_turns_garbage_into_null() {
        let table = ResultTable::new(
            vec!["PromedioHuella".into()],
            vec![
                vec![" 12.5 ".into()],
                vec!["7".into()],
                vec!["n/a".into()],
                vec![Value::Null],
                vec![Value::Real(3.0)],
                vec!["inf".into()],
            ],
        )
        .coerce_numeric("PromedioHuella");

        let column: Vec<Value> = table.rows.iter().map(|row| row[0].clone()).collect();
        assert_eq!(
            column,
            vec![
                Value::Real(12.5),
                Value::Integer(7),
                Value::Null,
                Value::Null,
                Value::Real(3.0),
                Value::Null,
            ]
        );
    }

    #[test]
    fn rename_only_touches_listed_columns() {
        let table = people().rename_columns(&[("ElementoCocina", "Elemento")]);
        assert_eq!(table.columns, vec!["IDPersona", "Elemento"]);
        assert_eq!(table.get(0, "Elemento"), Some(&Value::from("Refrigerator")));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let values = people().distinct("ElementoCocina");
        assert_eq!(
            values,
            vec![
                Value::from("Refrigerator"),
                Value::from("Stove"),
                Value::from("Oven")
            ]
        );
    }

    #[test]
    fn values_serialize_as_plain_json() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(3),
            Value::Real(1.5),
            Value::from("male"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,1.5,"male"]"#);
    }
}
