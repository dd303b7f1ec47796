use std::{fmt::Display, str::FromStr};

use super::{check_identifier, check_name, non_blank, ROW_CAP};
use crate::{core::SQLError, sql::parser::parse_expression};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER"),
            JoinKind::Left => write!(f, "LEFT"),
            JoinKind::Right => write!(f, "RIGHT"),
            JoinKind::Full => write!(f, "FULL"),
        }
    }
}

impl FromStr for JoinKind {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INNER" | "INNER JOIN" => Ok(JoinKind::Inner),
            "LEFT" | "LEFT JOIN" => Ok(JoinKind::Left),
            "RIGHT" | "RIGHT JOIN" => Ok(JoinKind::Right),
            "FULL" | "FULL JOIN" => Ok(JoinKind::Full),
            other => Err(SQLError::validation(format!("unknown join kind {:?}", other))),
        }
    }
}

/// One link of a join chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    /// Table being joined in.
    pub table: String,
    /// `table.column` already in scope. A bare column is qualified with the
    /// previous table of the chain.
    pub left: String,
    /// Column of `table`; may be given qualified.
    pub right: String,
}

/// Structured SELECT input. Blank optional fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    /// Empty means `*`.
    pub columns: Vec<String>,
    pub joins: Vec<JoinSpec>,
    /// Free-text predicate, checked to be a single expression.
    pub filter: String,
    /// Comma-separated column list.
    pub group_by: String,
    pub having: String,
    /// Comma-separated `column [ASC|DESC] [NULLS FIRST|LAST]` items.
    pub order_by: String,
    pub limit: String,
}

/// Renders SELECT-list, FROM, JOINs, WHERE, GROUP BY, HAVING, ORDER BY and
/// LIMIT in that order.
pub fn build_select(query: &SelectQuery) -> Result<String, SQLError> {
    let limit = match non_blank(&query.limit) {
        Some(limit) => Some(parse_limit(limit)?),
        None => None,
    };
    render_select(query, limit)
}

/// Renders a join chain over `query.table`. At least one link is required
/// and the result is always capped at [`ROW_CAP`] rows.
pub fn build_join_chain(query: &SelectQuery) -> Result<String, SQLError> {
    if query.joins.is_empty() {
        return Err(SQLError::validation("at least one join is required"));
    }
    render_select(query, Some(ROW_CAP as u64))
}

fn render_select(query: &SelectQuery, limit: Option<u64>) -> Result<String, SQLError> {
    let table = check_identifier(&query.table, "table")?;

    let mut sql = format!("SELECT {} FROM {}", render_projection(&query.columns)?, table);

    for join in render_joins(table, &query.joins)? {
        sql.push(' ');
        sql.push_str(&join);
    }

    if let Some(filter) = non_blank(&query.filter) {
        parse_expression(filter)?;
        sql.push_str(&format!(" WHERE {}", filter));
    }

    if let Some(group_by) = non_blank(&query.group_by) {
        let columns = group_by
            .split(',')
            .map(|column| check_identifier(column, "GROUP BY column"))
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&format!(" GROUP BY {}", columns.join(", ")));
    }

    if let Some(having) = non_blank(&query.having) {
        parse_expression(having)?;
        sql.push_str(&format!(" HAVING {}", having));
    }

    if let Some(order_by) = non_blank(&query.order_by) {
        let items = order_by
            .split(',')
            .map(render_order_item)
            .collect::<Result<Vec<_>, _>>()?;
        sql.push_str(&format!(" ORDER BY {}", items.join(", ")));
    }

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok(sql)
}

fn render_projection(columns: &[String]) -> Result<String, SQLError> {
    let columns = columns
        .iter()
        .filter_map(|column| non_blank(column))
        .map(|column| {
            if column == "*" {
                return Ok(column);
            }
            match column.strip_suffix(".*") {
                Some(table) => check_identifier(table, "table").map(|_| column),
                None => check_identifier(column, "column"),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        Ok("*".to_string())
    } else {
        Ok(columns.join(", "))
    }
}

/// Each link's ON clause compares the given left reference with the joined
/// table's column. Unqualified left references bind to the table joined
/// immediately before.
fn render_joins(base: &str, joins: &[JoinSpec]) -> Result<Vec<String>, SQLError> {
    let mut previous = base.to_string();
    let mut rendered = Vec::with_capacity(joins.len());

    for join in joins {
        let table = check_identifier(&join.table, "join table")?;
        let left = check_identifier(&join.left, "left join column")?;
        let right = check_identifier(&join.right, "right join column")?;

        let left = if left.contains('.') {
            left.to_string()
        } else {
            format!("{}.{}", previous, left)
        };
        let right = if right.contains('.') {
            right.to_string()
        } else {
            format!("{}.{}", table, right)
        };

        rendered.push(format!("{} JOIN {} ON {} = {}", join.kind, table, left, right));
        previous = table.to_string();
    }

    Ok(rendered)
}

fn render_order_item(item: &str) -> Result<String, SQLError> {
    let words = item.split_whitespace().collect::<Vec<_>>();
    let (column, modifiers) = match words.split_first() {
        Some(split) => split,
        None => return Err(SQLError::validation("empty ORDER BY item")),
    };

    let column: &str = column;
    let column = if column.chars().all(|c| c.is_ascii_digit()) {
        column
    } else {
        check_identifier(column, "ORDER BY column")?
    };

    let modifiers = modifiers
        .iter()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>();
    let valid = match modifiers.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => true,
        ["ASC"] | ["DESC"] => true,
        ["NULLS", "FIRST"] | ["NULLS", "LAST"] => true,
        ["ASC" | "DESC", "NULLS", "FIRST" | "LAST"] => true,
        _ => false,
    };
    if !valid {
        return Err(SQLError::validation(format!("invalid ORDER BY item {:?}", item.trim())));
    }

    let mut rendered = column.to_string();
    for modifier in modifiers {
        rendered.push(' ');
        rendered.push_str(&modifier);
    }
    Ok(rendered)
}

fn parse_limit(limit: &str) -> Result<u64, SQLError> {
    limit
        .parse()
        .map_err(|_| SQLError::validation(format!("LIMIT must be a non-negative integer, got {:?}", limit)))
}

/// `SELECT *, <expression> AS <alias> FROM <table>`, shared by the
/// expression builders.
pub(crate) fn select_with_expression(
    table: &str,
    expression: &str,
    alias: &str,
) -> Result<String, SQLError> {
    let table = check_identifier(table, "table")?;
    let alias = check_name(alias, "alias")?;
    Ok(format!("SELECT *, {} AS {} FROM {}", expression, alias, table))
}
