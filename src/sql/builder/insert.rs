use super::{check_identifier, check_name};
use crate::core::SQLError;

/// `INSERT INTO <table> (<columns>) VALUES ($1, ...)`, values left to bind
/// parameters.
pub fn build_insert(
    table: &str,
    columns: &[&str],
    returning: Option<&str>,
) -> Result<String, SQLError> {
    let table = check_identifier(table, "table")?;
    if columns.is_empty() {
        return Err(SQLError::validation("INSERT needs at least one column"));
    }

    let columns = columns
        .iter()
        .map(|column| check_name(column, "column"))
        .collect::<Result<Vec<_>, _>>()?;
    let placeholders = (1..=columns.len())
        .map(|index| format!("${}", index))
        .collect::<Vec<_>>();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    if let Some(returning) = returning {
        sql.push_str(&format!(" RETURNING {}", check_name(returning, "RETURNING column")?));
    }
    Ok(sql)
}
