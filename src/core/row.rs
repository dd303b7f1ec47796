use std::{fmt::Display, sync::Arc};

use super::Datum;

/// One result row keyed by column name. Rows of the same result share the
/// column list, so every row exposes exactly the result's column set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Datum>,
}

impl Row {
    /// Pads missing trailing values with `Null` and drops surplus ones.
    pub fn new(columns: Arc<Vec<String>>, mut values: Vec<Datum>) -> Self {
        values.resize(columns.len(), Datum::Null);
        Self { columns, values }
    }

    /// Looks a value up by column name. With duplicate names (e.g. `SELECT *`
    /// over a join) the leftmost column wins.
    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|index| &self.values[index])
    }

    pub fn get_index(&self, index: usize) -> Option<&Datum> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = self
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "{}", result)
    }
}
