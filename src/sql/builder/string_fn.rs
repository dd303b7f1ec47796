use std::{collections::HashMap, fmt::Display, str::FromStr};

use super::{check_identifier, non_blank, quote_literal};
use crate::{core::SQLError, sql::builder::select::select_with_expression};

lazy_static! {
    static ref STRING_FUNCTIONS: HashMap<&'static str, StringFunction> = {
        let mut registry = HashMap::new();
        for function in StringFunction::ALL {
            registry.insert(function.name(), function);
        }
        registry
    };
}

/// String functions the builder knows the argument grammar of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFunction {
    Upper,
    Lower,
    Length,
    Trim,
    LTrim,
    RTrim,
    /// `first` = start position (required), `second` = length.
    Substring,
    /// `first` = old substring, `second` = new substring; both required.
    Replace,
    /// `first` and `second` are appended when non-empty.
    Concat,
    /// `first` = separator (default a space), `second` = appended value.
    ConcatWs,
    /// `first` = target length (required), `second` = fill (default a space).
    LPad,
    RPad,
}

impl StringFunction {
    pub const ALL: [StringFunction; 12] = [
        StringFunction::Upper,
        StringFunction::Lower,
        StringFunction::Length,
        StringFunction::Trim,
        StringFunction::LTrim,
        StringFunction::RTrim,
        StringFunction::Substring,
        StringFunction::Replace,
        StringFunction::Concat,
        StringFunction::ConcatWs,
        StringFunction::LPad,
        StringFunction::RPad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StringFunction::Upper => "UPPER",
            StringFunction::Lower => "LOWER",
            StringFunction::Length => "LENGTH",
            StringFunction::Trim => "TRIM",
            StringFunction::LTrim => "LTRIM",
            StringFunction::RTrim => "RTRIM",
            StringFunction::Substring => "SUBSTRING",
            StringFunction::Replace => "REPLACE",
            StringFunction::Concat => "CONCAT",
            StringFunction::ConcatWs => "CONCAT_WS",
            StringFunction::LPad => "LPAD",
            StringFunction::RPad => "RPAD",
        }
    }
}

impl Display for StringFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StringFunction {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STRING_FUNCTIONS
            .get(s.trim().to_uppercase().as_str())
            .copied()
            .ok_or_else(|| SQLError::validation(format!("unknown string function {:?}", s.trim())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringFunctionInput {
    pub table: String,
    pub column: String,
    pub function: StringFunction,
    /// Text arguments are used verbatim, so a single space is a valid value.
    pub first: String,
    pub second: String,
    pub alias: String,
}

/// Renders just the function call over `column`.
pub fn render_string_function(input: &StringFunctionInput) -> Result<String, SQLError> {
    let column = check_identifier(&input.column, "column")?;
    let name = input.function.name();

    let call = match input.function {
        StringFunction::Upper
        | StringFunction::Lower
        | StringFunction::Length
        | StringFunction::Trim
        | StringFunction::LTrim
        | StringFunction::RTrim => format!("{}({})", name, column),
        StringFunction::Substring => {
            let start = integer_argument(&input.first, "SUBSTRING start position")?;
            match non_blank(&input.second) {
                Some(length) => format!(
                    "SUBSTRING({} FROM {} FOR {})",
                    column,
                    start,
                    integer_argument(length, "SUBSTRING length")?
                ),
                None => format!("SUBSTRING({} FROM {})", column, start),
            }
        }
        StringFunction::Replace => {
            if input.first.is_empty() || input.second.is_empty() {
                return Err(SQLError::validation(
                    "REPLACE needs both the substring to find and its replacement",
                ));
            }
            format!(
                "REPLACE({}, {}, {})",
                column,
                quote_literal(&input.first),
                quote_literal(&input.second)
            )
        }
        StringFunction::Concat => {
            let mut arguments = vec![column.to_string()];
            arguments.extend(
                [&input.first, &input.second]
                    .into_iter()
                    .filter(|value| !value.is_empty())
                    .map(|value| quote_literal(value)),
            );
            format!("CONCAT({})", arguments.join(", "))
        }
        StringFunction::ConcatWs => {
            let separator = if input.first.is_empty() {
                " "
            } else {
                input.first.as_str()
            };
            let mut arguments = vec![quote_literal(separator), column.to_string()];
            if !input.second.is_empty() {
                arguments.push(quote_literal(&input.second));
            }
            format!("CONCAT_WS({})", arguments.join(", "))
        }
        StringFunction::LPad | StringFunction::RPad => {
            let length = integer_argument(&input.first, &format!("{} length", name))?;
            let fill = if input.second.is_empty() {
                " "
            } else {
                input.second.as_str()
            };
            format!("{}({}, {}, {})", name, column, length, quote_literal(fill))
        }
    };

    Ok(call)
}

/// `SELECT *, <call> AS <alias> FROM <table>`.
pub fn build_string_function(input: &StringFunctionInput) -> Result<String, SQLError> {
    let call = render_string_function(input)?;
    let default_alias = format!("{}_result", input.function.name().to_lowercase());
    let alias = non_blank(&input.alias).unwrap_or(default_alias.as_str());
    select_with_expression(&input.table, &call, alias)
}

fn integer_argument(value: &str, what: &str) -> Result<i64, SQLError> {
    let value = non_blank(value).ok_or_else(|| SQLError::validation(format!("{} is required", what)))?;
    value
        .parse()
        .map_err(|_| SQLError::validation(format!("{} must be an integer, got {:?}", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::builder::testing::assert_parses;

    fn input(function: StringFunction, first: &str, second: &str) -> StringFunctionInput {
        StringFunctionInput {
            table: "experiments".into(),
            column: "name".into(),
            function,
            first: first.into(),
            second: second.into(),
            alias: String::new(),
        }
    }

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!("concat_ws".parse::<StringFunction>().unwrap(), StringFunction::ConcatWs);
        assert_eq!(" lpad ".parse::<StringFunction>().unwrap(), StringFunction::LPad);
        assert!("REVERSE".parse::<StringFunction>().is_err());
        for function in StringFunction::ALL {
            assert_eq!(function.name().parse::<StringFunction>().unwrap(), function);
        }
    }

    #[test]
    fn single_argument_functions() {
        let sql = build_string_function(&input(StringFunction::Upper, "", "")).unwrap();
        assert_eq!(sql, "SELECT *, UPPER(name) AS upper_result FROM experiments");
        assert_parses(&sql);
    }

    #[test]
    fn substring_requires_start() {
        assert!(render_string_function(&input(StringFunction::Substring, "", "3")).is_err());
        assert!(render_string_function(&input(StringFunction::Substring, "x", "")).is_err());
        assert_eq!(
            render_string_function(&input(StringFunction::Substring, "2", "")).unwrap(),
            "SUBSTRING(name FROM 2)"
        );

        let sql = build_string_function(&input(StringFunction::Substring, "2", "3")).unwrap();
        assert!(sql.contains("SUBSTRING(name FROM 2 FOR 3)"));
        assert_parses(&sql);
    }

    #[test]
    fn replace_requires_both_sides() {
        assert!(render_string_function(&input(StringFunction::Replace, "a", "")).is_err());
        assert!(render_string_function(&input(StringFunction::Replace, "", "b")).is_err());
        assert_eq!(
            render_string_function(&input(StringFunction::Replace, " ", "_")).unwrap(),
            "REPLACE(name, ' ', '_')"
        );
    }

    #[test]
    fn padding_defaults_fill_to_space() {
        assert!(render_string_function(&input(StringFunction::LPad, "", "*")).is_err());
        assert_eq!(
            render_string_function(&input(StringFunction::LPad, "10", "")).unwrap(),
            "LPAD(name, 10, ' ')"
        );
        assert_eq!(
            render_string_function(&input(StringFunction::RPad, "8", "*")).unwrap(),
            "RPAD(name, 8, '*')"
        );
    }

    #[test]
    fn concat_variants() {
        assert_eq!(
            render_string_function(&input(StringFunction::Concat, "-", "")).unwrap(),
            "CONCAT(name, '-')"
        );
        assert_eq!(
            render_string_function(&input(StringFunction::ConcatWs, "", "v2")).unwrap(),
            "CONCAT_WS(' ', name, 'v2')"
        );
        let sql = build_string_function(&input(StringFunction::Concat, "'s", "!")).unwrap();
        assert!(sql.contains("CONCAT(name, '''s', '!')"));
        assert_parses(&sql);
    }
}
