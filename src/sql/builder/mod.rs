//! Pure functions that render SQL text from structured, partially filled
//! input. Nothing here talks to a backend.
//!
//! Identifiers (tables, columns, aliases) are interpolated only after they
//! pass [`check_identifier`]; callers with a live catalog should also run
//! them through [`crate::catalog::Catalog`]. Values embedded in composite
//! text are rendered with [`quote_literal`].

use crate::core::SQLError;

pub mod alter;
pub mod expression;
pub mod insert;
pub mod pattern;
pub mod select;
pub mod string_fn;
pub mod subquery;
pub mod types;

pub use alter::*;
pub use expression::*;
pub use insert::*;
pub use pattern::*;
pub use select::*;
pub use string_fn::*;
pub use subquery::*;
pub use types::*;

/// Row cap appended by the exploratory builders.
pub const ROW_CAP: u32 = 100;

/// `Some(trimmed)` when the field carries anything but whitespace.
pub fn non_blank(field: &str) -> Option<&str> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Returns the trimmed value of a required field.
pub fn required<'a>(field: &'a str, what: &str) -> Result<&'a str, SQLError> {
    non_blank(field).ok_or_else(|| SQLError::validation(format!("{} is required", what)))
}

/// A bare name: ASCII letters, digits and underscores, not starting with a
/// digit.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks a bare name, such as a new column, alias or type name, and returns
/// it trimmed.
pub fn check_name<'a>(name: &'a str, what: &str) -> Result<&'a str, SQLError> {
    let name = required(name, what)?;
    if !is_identifier(name) {
        return Err(SQLError::validation(format!(
            "{} {:?} must contain only letters, digits and underscores",
            what, name
        )));
    }
    Ok(name)
}

/// Checks a possibly qualified name (`column`, `table.column`,
/// `schema.table.column`) and returns it trimmed.
pub fn check_identifier<'a>(name: &'a str, what: &str) -> Result<&'a str, SQLError> {
    let name = required(name, what)?;
    let parts = name.split('.').collect::<Vec<_>>();
    if parts.len() > 3 || !parts.iter().all(|part| is_identifier(part)) {
        return Err(SQLError::validation(format!(
            "{} {:?} is not a valid identifier",
            what, name
        )));
    }
    Ok(name)
}

/// Single-quoted string literal with embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Whether the text is a plain decimal number literal (`12`, `-3.5`, `1e6`).
/// Words that Rust's float parser accepts, such as `NaN` or `inf`, are not.
pub fn is_numeric_literal(value: &str) -> bool {
    let value = value.trim();
    let body = value.strip_prefix(['-', '+']).unwrap_or(value);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };

    let mut parts = mantissa.splitn(2, '.');
    let integer = parts.next().unwrap_or("");
    let fraction = parts.next();
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let mantissa_ok = match fraction {
        Some(fraction) => {
            digits(integer) && digits(fraction) && !(integer.is_empty() && fraction.is_empty())
        }
        None => !integer.is_empty() && digits(integer),
    };

    let exponent_ok = match exponent {
        Some(exponent) => {
            let exponent = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
            !exponent.is_empty() && digits(exponent)
        }
        None => true,
    };

    mantissa_ok && exponent_ok
}

/// Numeric text is rendered bare, anything else as a quoted literal.
pub fn render_value(value: &str) -> String {
    let value = value.trim();
    if is_numeric_literal(value) {
        value.to_string()
    } else {
        quote_literal(value)
    }
}
