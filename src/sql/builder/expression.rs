use super::{check_identifier, non_blank, quote_literal, render_value, required};
use crate::{core::SQLError, sql::builder::select::select_with_expression};

/// Fallback injected when COALESCE is given a column and nothing else.
pub const COALESCE_DEFAULT: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhenThen {
    pub when: String,
    pub then: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseInput {
    pub table: String,
    /// Optional. Without it each WHEN tests its value directly.
    pub column: String,
    pub branches: Vec<WhenThen>,
    pub otherwise: String,
    pub alias: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalesceInput {
    pub table: String,
    pub column: String,
    pub fallbacks: Vec<String>,
    pub alias: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullIfInput {
    pub table: String,
    pub column: String,
    pub value: String,
    pub alias: String,
}

/// `SELECT *, CASE WHEN ... END AS <alias> FROM <table>`.
///
/// Branches with a blank WHEN or THEN are skipped. When none survive the
/// input is rejected, since PostgreSQL has no branchless CASE.
pub fn build_case(input: &CaseInput) -> Result<String, SQLError> {
    let column = match non_blank(&input.column) {
        Some(column) => Some(check_identifier(column, "column")?),
        None => None,
    };

    let branches = input
        .branches
        .iter()
        .filter_map(|branch| Some((non_blank(&branch.when)?, non_blank(&branch.then)?)))
        .map(|(when, then)| match column {
            Some(column) => format!(
                "WHEN {} = {} THEN {}",
                column,
                quote_literal(when),
                quote_literal(then)
            ),
            None => format!("WHEN {} THEN {}", quote_literal(when), quote_literal(then)),
        })
        .collect::<Vec<_>>();

    if branches.is_empty() {
        return Err(SQLError::validation(
            "CASE needs at least one WHEN/THEN pair with both sides filled in",
        ));
    }

    let mut expression = format!("CASE {}", branches.join(" "));
    if let Some(otherwise) = non_blank(&input.otherwise) {
        expression.push_str(&format!(" ELSE {}", quote_literal(otherwise)));
    }
    expression.push_str(" END");

    select_with_expression(&input.table, &expression, alias_or(&input.alias, "case_result"))
}

/// `SELECT *, COALESCE(<column>, <fallbacks>...) AS <alias> FROM <table>`.
/// Always renders at least two arguments.
pub fn build_coalesce(input: &CoalesceInput) -> Result<String, SQLError> {
    let column = check_identifier(&input.column, "column")?;

    let mut arguments = vec![column.to_string()];
    arguments.extend(
        input
            .fallbacks
            .iter()
            .filter_map(|value| non_blank(value))
            .map(render_value),
    );
    if arguments.len() == 1 {
        arguments.push(quote_literal(COALESCE_DEFAULT));
    }

    let expression = format!("COALESCE({})", arguments.join(", "));
    select_with_expression(&input.table, &expression, alias_or(&input.alias, "coalesce_result"))
}

/// `SELECT *, NULLIF(<column>, <value>) AS <alias> FROM <table>`.
pub fn build_nullif(input: &NullIfInput) -> Result<String, SQLError> {
    let column = check_identifier(&input.column, "column")?;
    let value = required(&input.value, "NULLIF value")?;

    let expression = format!("NULLIF({}, {})", column, render_value(value));
    select_with_expression(&input.table, &expression, alias_or(&input.alias, "nullif_result"))
}

fn alias_or<'a>(alias: &'a str, default: &'a str) -> &'a str {
    non_blank(alias).unwrap_or(default)
}
