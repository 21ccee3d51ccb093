//! Grouped reductions that feed the charts.
//!
//! Every function reads its input table and returns a fresh one. Groups come out in ascending
//! key order and rows whose key is null are left out.

use crate::errors::ChartError;
use crate::models::{ResultTable, Value};

/// How a view turns its fetched rows into chart data.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Chart the table as fetched.
    Identity,
    Count {
        by: &'static str,
        count_column: &'static str,
    },
    Mean {
        by: &'static str,
        measures: &'static [&'static str],
        melt: Option<Melt>,
    },
}

/// Wide-to-long reshape applied after a [`Aggregation::Mean`].
#[derive(Debug, Clone, PartialEq)]
pub struct Melt {
    pub var_name: &'static str,
    pub value_name: &'static str,
}

impl Aggregation {
    pub fn apply(&self, table: &ResultTable) -> Result<ResultTable, ChartError> {
        match self {
            Aggregation::Identity => Ok(table.clone()),
            Aggregation::Count { by, count_column } => count_by(table, by, count_column),
            Aggregation::Mean { by, measures, melt: reshape } => {
                let wide = mean_by(table, by, measures)?;
                match reshape {
                    Some(reshape) => {
                        melt(&wide, by, measures, reshape.var_name, reshape.value_name)
                    }
                    None => Ok(wide),
                }
            }
        }
    }
}

pub fn count_by(
    table: &ResultTable,
    column: &str,
    count_column: &str,
) -> Result<ResultTable, ChartError> {
    let groups = group_rows(table, column)?;
    let rows = groups
        .into_iter()
        .map(|(key, rows)| vec![key, Value::Integer(rows.len() as i64)])
        .collect();

    Ok(ResultTable::new(
        vec![column.to_string(), count_column.to_string()],
        rows,
    ))
}

pub fn mean_by(
    table: &ResultTable,
    column: &str,
    measures: &[&str],
) -> Result<ResultTable, ChartError> {
    let indices = measures
        .iter()
        .map(|measure| require_column(table, measure))
        .collect::<Result<Vec<_>, _>>()?;
    let groups = group_rows(table, column)?;

    let mut rows = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut row = Vec::with_capacity(measures.len() + 1);
        row.push(key);
        for (&index, measure) in indices.iter().zip(measures) {
            let mut sum = 0.0;
            let mut count = 0usize;
            for member in &members {
                let cell = &table.rows[*member][index];
                match cell {
                    Value::Null => {}
                    Value::Text(text) => {
                        return Err(ChartError::NonNumeric {
                            column: measure.to_string(),
                            value: text.clone(),
                        });
                    }
                    other => {
                        sum += other.as_f64().unwrap_or_default();
                        count += 1;
                    }
                }
            }
            row.push(if count == 0 {
                Value::Null
            } else {
                Value::Real(sum / count as f64)
            });
        }
        rows.push(row);
    }

    let mut columns = vec![column.to_string()];
    columns.extend(measures.iter().map(|measure| measure.to_string()));
    Ok(ResultTable::new(columns, rows))
}

/// Wide to long: one output row per (value column, input row), blocked by value column.
pub fn melt(
    table: &ResultTable,
    id_column: &str,
    value_columns: &[&str],
    var_name: &str,
    value_name: &str,
) -> Result<ResultTable, ChartError> {
    let id_index = require_column(table, id_column)?;
    let mut rows = Vec::with_capacity(table.len() * value_columns.len());
    for value_column in value_columns {
        let index = require_column(table, value_column)?;
        for row in &table.rows {
            rows.push(vec![
                row[id_index].clone(),
                Value::from(*value_column),
                row[index].clone(),
            ]);
        }
    }

    Ok(ResultTable::new(
        vec![
            id_column.to_string(),
            var_name.to_string(),
            value_name.to_string(),
        ],
        rows,
    ))
}

fn require_column(table: &ResultTable, column: &str) -> Result<usize, ChartError> {
    table
        .column_index(column)
        .ok_or_else(|| ChartError::MissingColumn(column.to_string()))
}

fn group_rows(table: &ResultTable, column: &str) -> Result<Vec<(Value, Vec<usize>)>, ChartError> {
    let index = require_column(table, column)?;
    let mut groups: Vec<(Value, Vec<usize>)> = Vec::new();
    for (position, row) in table.rows.iter().enumerate() {
        let key = &row[index];
        if key.is_null() {
            continue;
        }
        match groups.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, members)) => members.push(position),
            None => groups.push((key.clone(), vec![position])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| a.sort_cmp(b));
    Ok(groups)
}
