use std::{fmt::Display, str::FromStr};

use super::{check_identifier, quote_literal, ROW_CAP};
use crate::core::SQLError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Like,
    NotLike,
    /// `~`
    Match,
    /// `~*`
    MatchInsensitive,
    /// `!~`
    NotMatch,
    /// `!~*`
    NotMatchInsensitive,
    SimilarTo,
    NotSimilarTo,
}

impl PatternKind {
    pub fn operator(self) -> &'static str {
        match self {
            PatternKind::Like => "LIKE",
            PatternKind::NotLike => "NOT LIKE",
            PatternKind::Match => "~",
            PatternKind::MatchInsensitive => "~*",
            PatternKind::NotMatch => "!~",
            PatternKind::NotMatchInsensitive => "!~*",
            PatternKind::SimilarTo => "SIMILAR TO",
            PatternKind::NotSimilarTo => "NOT SIMILAR TO",
        }
    }
}

impl Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.operator())
    }
}

impl FromStr for PatternKind {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "LIKE" => Ok(PatternKind::Like),
            "NOT LIKE" => Ok(PatternKind::NotLike),
            "~" => Ok(PatternKind::Match),
            "~*" => Ok(PatternKind::MatchInsensitive),
            "!~" => Ok(PatternKind::NotMatch),
            "!~*" => Ok(PatternKind::NotMatchInsensitive),
            "SIMILAR TO" => Ok(PatternKind::SimilarTo),
            "NOT SIMILAR TO" => Ok(PatternKind::NotSimilarTo),
            _ => Err(SQLError::validation(format!("unknown search kind {:?}", s.trim()))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSearch {
    pub table: String,
    pub column: String,
    pub kind: PatternKind,
    /// Used verbatim; an empty pattern is rejected.
    pub pattern: String,
}

/// `SELECT * FROM <table> WHERE <column> <op> '<pattern>' LIMIT 100`.
pub fn build_pattern_search(search: &PatternSearch) -> Result<String, SQLError> {
    let table = check_identifier(&search.table, "table")?;
    let column = check_identifier(&search.column, "column")?;
    if search.pattern.is_empty() {
        return Err(SQLError::validation("search pattern is required"));
    }

    Ok(format!(
        "SELECT * FROM {} WHERE {} {} {} LIMIT {}",
        table,
        column,
        search.kind,
        quote_literal(&search.pattern),
        ROW_CAP
    ))
}
