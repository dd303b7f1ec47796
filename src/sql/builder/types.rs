use super::{check_name, is_identifier, non_blank, quote_literal, required};
use crate::{core::SQLError, sql::parser::parse_data_type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    /// Comma-separated labels, e.g. `active, paused, done`.
    Enum { labels: String },
    /// Comma-separated `name:type` pairs, e.g. `lo:integer, hi:integer`.
    Composite { fields: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateType {
    pub name: String,
    pub definition: TypeDefinition,
}

pub fn build_create_type(create: &CreateType) -> Result<String, SQLError> {
    let name = check_name(&create.name, "type name")?;

    match &create.definition {
        TypeDefinition::Enum { labels } => {
            let labels = enum_labels(labels);
            if labels.is_empty() {
                return Err(SQLError::validation("ENUM type needs at least one value"));
            }
            let labels = labels.into_iter().map(quote_literal).collect::<Vec<_>>();
            Ok(format!("CREATE TYPE {} AS ENUM ({})", name, labels.join(", ")))
        }
        TypeDefinition::Composite { fields } => {
            let fields = composite_fields(fields)?;
            let fields = fields
                .iter()
                .map(|(field, data_type)| format!("{} {}", field, data_type))
                .collect::<Vec<_>>();
            Ok(format!("CREATE TYPE {} AS ({})", name, fields.join(", ")))
        }
    }
}

pub fn build_drop_type(name: &str, cascade: bool) -> Result<String, SQLError> {
    let name = check_name(name, "type name")?;
    let mut sql = format!("DROP TYPE {}", name);
    if cascade {
        sql.push_str(" CASCADE");
    }
    Ok(sql)
}

/// Trimmed, non-blank labels in declaration order.
fn enum_labels(labels: &str) -> Vec<&str> {
    labels.split(',').filter_map(non_blank).collect()
}

/// Parses `name:type` pairs, failing on the first malformed one.
fn composite_fields(fields: &str) -> Result<Vec<(&str, &str)>, SQLError> {
    let mut parsed = vec![];

    for entry in fields.split(',').filter_map(non_blank) {
        let (field, data_type) = entry.split_once(':').ok_or_else(|| {
            SQLError::validation(format!("composite field {:?} must look like name:type", entry))
        })?;

        let field = field.trim();
        if !is_identifier(field) {
            return Err(SQLError::validation(format!(
                "field name {:?} must contain only letters, digits and underscores",
                field
            )));
        }
        let data_type = required(data_type, &format!("type of field {}", field))?;
        parse_data_type(data_type)?;

        parsed.push((field, data_type));
    }

    if parsed.is_empty() {
        return Err(SQLError::validation("composite type needs at least one field"));
    }
    Ok(parsed)
}
