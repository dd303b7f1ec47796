//! Entities of an A/B test and the rules they must satisfy before being
//! persisted.

use std::{fmt::Display, str::FromStr};

use crate::core::{ErrorKind, SQLError};

pub mod experiment;
pub mod result;
pub mod store;
pub mod user;

pub use experiment::Experiment;
pub use result::ResultRecord;
pub use user::User;

/// Longest text any entity field may hold.
pub const MAX_TEXT_LEN: usize = 255;

/// The first rule an entity broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Empty { field: &'static str },
    TooLong { field: &'static str, max: usize },
    OutOfRange { field: &'static str, min: i64, max: i64, value: i64 },
    Negative { field: &'static str },
    NotPositive { field: &'static str },
    IdenticalAlgorithms,
    UnknownGroup(String),
    RatingWithoutClick,
    ClickWithoutTimestamp,
    TimestampWithoutClick,
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Empty { field } => write!(f, "{} must not be empty", field),
            Violation::TooLong { field, max } => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            Violation::OutOfRange { field, min, max, value } => {
                write!(f, "{} must be between {} and {}, got {}", field, min, max, value)
            }
            Violation::Negative { field } => write!(f, "{} must not be negative", field),
            Violation::NotPositive { field } => write!(f, "{} must be positive", field),
            Violation::IdenticalAlgorithms => {
                write!(f, "algorithm A and algorithm B must differ")
            }
            Violation::UnknownGroup(group) => {
                write!(f, "group {:?} is not one of A, B", group)
            }
            Violation::RatingWithoutClick => write!(f, "rating without click"),
            Violation::ClickWithoutTimestamp => write!(f, "click without timestamp"),
            Violation::TimestampWithoutClick => write!(f, "click timestamp without click"),
        }
    }
}

impl From<Violation> for SQLError {
    fn from(violation: Violation) -> Self {
        SQLError::new(ErrorKind::ValidationError, violation.to_string())
    }
}

/// The two arms of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    A,
    B,
}

impl Group {
    pub fn as_str(self) -> &'static str {
        match self {
            Group::A => "A",
            Group::B => "B",
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Group {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Group::A),
            "B" | "b" => Ok(Group::B),
            other => Err(Violation::UnknownGroup(other.to_string())),
        }
    }
}

/// Non-blank text of at most [`MAX_TEXT_LEN`] characters.
pub(crate) fn check_text(field: &'static str, value: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        return Err(Violation::Empty { field });
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(Violation::TooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

pub(crate) fn check_non_negative(field: &'static str, value: i64) -> Result<(), Violation> {
    if value < 0 {
        return Err(Violation::Negative { field });
    }
    Ok(())
}

pub(crate) fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), Violation> {
    if value < min || value > max {
        return Err(Violation::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}
