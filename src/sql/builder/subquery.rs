use std::{fmt::Display, str::FromStr};

use super::{check_identifier, check_name, non_blank, quote_literal, ROW_CAP};
use crate::core::SQLError;

/// Operators a WHERE condition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Like,
    In,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::GtEq => ">=",
            Operator::LtEq => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator renders without a value.
    pub fn is_null_test(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Whether the operator may prefix ANY/ALL.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::NotEq | Operator::Gt | Operator::Lt | Operator::GtEq | Operator::LtEq
        )
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Operator {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" => Ok(Operator::Eq),
            "!=" | "<>" => Ok(Operator::NotEq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::GtEq),
            "<=" => Ok(Operator::LtEq),
            "LIKE" => Ok(Operator::Like),
            "IN" => Ok(Operator::In),
            "IS NULL" => Ok(Operator::IsNull),
            "IS NOT NULL" => Ok(Operator::IsNotNull),
            _ => Err(SQLError::validation(format!("unknown operator {:?}", s.trim()))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereCondition {
    pub column: String,
    pub operator: Operator,
    /// Ignored for IS NULL / IS NOT NULL. For IN, a comma-separated list.
    pub value: String,
    /// `value` names a column of the outer query instead of a literal.
    pub correlated: bool,
}

impl WhereCondition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            correlated: false,
        }
    }

    /// Compares against an outer column, e.g. `u.id` when the outer table
    /// is aliased `u`. Only comparison operators apply.
    pub fn correlated(
        column: impl Into<String>,
        operator: Operator,
        outer_column: impl Into<String>,
    ) -> Self {
        Self {
            correlated: true,
            ..Self::new(column, operator, outer_column)
        }
    }

    fn render(&self) -> Result<String, SQLError> {
        let column = check_identifier(&self.column, "condition column")?;

        if self.correlated {
            if !self.operator.is_comparison() {
                return Err(SQLError::validation(format!(
                    "{} cannot compare against an outer column",
                    self.operator
                )));
            }
            let outer = check_identifier(&self.value, "outer column")?;
            return Ok(format!("{} {} {}", column, self.operator, outer));
        }

        let rendered = match self.operator {
            Operator::IsNull | Operator::IsNotNull => format!("{} {}", column, self.operator),
            Operator::In => {
                let items = self
                    .value
                    .split(',')
                    .filter_map(non_blank)
                    .map(quote_literal)
                    .collect::<Vec<_>>();
                if items.is_empty() {
                    return Err(SQLError::validation(format!(
                        "IN condition on {} needs at least one value",
                        column
                    )));
                }
                format!("{} IN ({})", column, items.join(", "))
            }
            _ => format!("{} {} {}", column, self.operator, quote_literal(&self.value)),
        };

        Ok(rendered)
    }
}

/// Joins conditions with AND. No conditions renders the tautology `1=1`.
pub fn build_where_clause(conditions: &[WhereCondition]) -> Result<String, SQLError> {
    if conditions.is_empty() {
        return Ok("1=1".to_string());
    }

    let rendered = conditions
        .iter()
        .map(WhereCondition::render)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(" AND "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    Any,
    All,
    Exists,
}

impl Display for SubqueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubqueryKind::Any => write!(f, "ANY"),
            SubqueryKind::All => write!(f, "ALL"),
            SubqueryKind::Exists => write!(f, "EXISTS"),
        }
    }
}

impl FromStr for SubqueryKind {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANY" => Ok(SubqueryKind::Any),
            "ALL" => Ok(SubqueryKind::All),
            "EXISTS" => Ok(SubqueryKind::Exists),
            _ => Err(SQLError::validation(format!("unknown subquery kind {:?}", s.trim()))),
        }
    }
}

/// The inner SELECT of a subquery predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subquery {
    pub table: String,
    /// Projected column; required for ANY/ALL, unused for EXISTS.
    pub column: String,
    pub conditions: Vec<WhereCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubqueryCondition {
    pub kind: SubqueryKind,
    /// Outer column compared against the subquery; ignored for EXISTS.
    pub column: String,
    /// Comparison operator; ignored for EXISTS.
    pub operator: Option<Operator>,
    pub subquery: Subquery,
    /// Alias of the outer table. Inner conditions built with
    /// [`WhereCondition::correlated`] can then refer to it, as in
    /// `orders.user_id = u.id`.
    pub alias: Option<String>,
}

/// Renders only the predicate, e.g. `EXISTS (SELECT 1 FROM ...)` or
/// `price > ALL (SELECT price FROM ...)`.
pub fn build_subquery_predicate(condition: &SubqueryCondition) -> Result<String, SQLError> {
    let inner = &condition.subquery;
    let table = check_identifier(&inner.table, "subquery table")?;
    let filter = build_where_clause(&inner.conditions)?;

    match condition.kind {
        SubqueryKind::Exists => Ok(format!(
            "EXISTS (SELECT 1 FROM {} WHERE {})",
            table, filter
        )),
        SubqueryKind::Any | SubqueryKind::All => {
            let column = check_identifier(&condition.column, "main table column")?;
            let sub_column = check_identifier(&inner.column, "subquery column")?;
            let operator = match condition.operator {
                Some(operator) if operator.is_comparison() => operator,
                Some(operator) => {
                    return Err(SQLError::validation(format!(
                        "{} cannot be used with {}",
                        operator, condition.kind
                    )))
                }
                None => {
                    return Err(SQLError::validation(format!(
                        "{} needs a comparison operator",
                        condition.kind
                    )))
                }
            };

            Ok(format!(
                "{} {} {} (SELECT {} FROM {} WHERE {})",
                column, operator, condition.kind, sub_column, table, filter
            ))
        }
    }
}

/// `SELECT * FROM <table> [AS <alias>] WHERE <predicate> LIMIT 100`.
pub fn build_subquery_query(
    table: &str,
    condition: &SubqueryCondition,
) -> Result<String, SQLError> {
    let table = check_identifier(table, "table")?;
    let from = match condition.alias.as_deref().and_then(non_blank) {
        Some(alias) => format!("{} AS {}", table, check_name(alias, "alias")?),
        None => table.to_string(),
    };

    Ok(format!(
        "SELECT * FROM {} WHERE {} LIMIT {}",
        from,
        build_subquery_predicate(condition)?,
        ROW_CAP
    ))
}
