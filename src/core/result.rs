use std::sync::Arc;

use super::{Datum, Row};

/// Positional rows as a backend hands them back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Datum>>,
}

/// Outcome of a generic query. A statement the engine rejected is reported
/// through `error` with no rows, not as an `Err` of the call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn from_row_set(row_set: RowSet) -> Self {
        let columns = Arc::new(row_set.columns);
        let rows = row_set
            .rows
            .into_iter()
            .map(|values| Row::new(columns.clone(), values))
            .collect();

        Self {
            columns: columns.to_vec(),
            rows,
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            columns: vec![],
            rows: vec![],
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
