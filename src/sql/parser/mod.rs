use sqlparser::{
    ast::{DataType, Expr, Statement},
    dialect::PostgreSqlDialect,
    parser::Parser,
    tokenizer::Token,
};

use crate::core::SQLError;

/// Parse SQL string into AST
pub fn parse_sql(sql_text: &str) -> Result<Statement, SQLError> {
    let parser = Parser::new(&PostgreSqlDialect {});

    let statement = parser
        .try_with_sql(sql_text)
        .and_then(|mut parser| parser.parse_statement())
        .map_err(|e| SQLError::validation(e.to_string()))?;

    Ok(statement)
}

/// Parse free text that must be exactly one scalar expression, e.g. a HAVING
/// or CHECK body. Trailing tokens such as `; DROP TABLE x` are rejected.
pub fn parse_expression(text: &str) -> Result<Expr, SQLError> {
    let parser = Parser::new(&PostgreSqlDialect {});

    parser
        .try_with_sql(text)
        .and_then(|mut parser| {
            let expr = parser.parse_expr()?;
            parser.expect_token(&Token::EOF)?;
            Ok(expr)
        })
        .map_err(|e| SQLError::validation(format!("invalid expression {:?}: {}", text, e)))
}

/// Parse a column or field type such as `varchar(255)` or `numeric(10, 2)`.
pub fn parse_data_type(text: &str) -> Result<DataType, SQLError> {
    let parser = Parser::new(&PostgreSqlDialect {});

    parser
        .try_with_sql(text)
        .and_then(|mut parser| {
            let data_type = parser.parse_data_type()?;
            parser.expect_token(&Token::EOF)?;
            Ok(data_type)
        })
        .map_err(|e| SQLError::validation(format!("invalid data type {:?}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_parse() {
        assert!(matches!(
            parse_sql("SELECT id FROM experiments").unwrap(),
            Statement::Query(_)
        ));
        assert!(parse_sql("SELEKT 1").is_err());
    }

    #[test]
    fn expression_must_be_complete() {
        assert!(parse_expression("COUNT(*) > 1").is_ok());
        assert!(parse_expression("rating BETWEEN 0 AND 5").is_ok());
        assert!(parse_expression("1; DROP TABLE users").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn data_types_parse() {
        assert!(parse_data_type("varchar(255)").is_ok());
        assert!(parse_data_type("INTEGER").is_ok());
        assert!(parse_data_type("mood").is_ok());
        assert!(parse_data_type("int; DROP TABLE users").is_err());
    }
}
