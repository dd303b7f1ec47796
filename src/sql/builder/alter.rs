use std::{fmt::Display, str::FromStr};

use super::{check_identifier, check_name, non_blank, required};
use crate::{
    core::SQLError,
    sql::parser::{parse_data_type, parse_expression},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
}

impl ConstraintType {
    pub fn keyword(self) -> &'static str {
        match self {
            ConstraintType::PrimaryKey => "PRIMARY KEY",
            ConstraintType::ForeignKey => "FOREIGN KEY",
            ConstraintType::Unique => "UNIQUE",
            ConstraintType::Check => "CHECK",
        }
    }
}

impl Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

impl FromStr for ConstraintType {
    type Err = SQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        match normalized.as_str() {
            "PRIMARY KEY" => Ok(ConstraintType::PrimaryKey),
            "FOREIGN KEY" => Ok(ConstraintType::ForeignKey),
            "UNIQUE" => Ok(ConstraintType::Unique),
            "CHECK" => Ok(ConstraintType::Check),
            _ => Err(SQLError::validation(format!("unknown constraint type {:?}", s.trim()))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddColumn {
        column: String,
        data_type: String,
        /// Optional default expression.
        default: String,
        not_null: bool,
    },
    DropColumn {
        column: String,
    },
    RenameColumn {
        column: String,
        new_name: String,
    },
    ChangeColumnType {
        column: String,
        data_type: String,
    },
    /// `value` is the `table.column` reference for FOREIGN KEY and the
    /// expression for CHECK; the other types ignore it.
    AddConstraint {
        column: String,
        constraint: ConstraintType,
        value: String,
    },
    DropConstraint {
        name: String,
    },
    RenameTable {
        new_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub table: String,
    pub action: AlterAction,
}

/// Deterministic constraint name: `<table>_<column>_<type>`, with the type
/// lowercased and spaces turned into underscores. A schema-qualified table
/// contributes only its last segment.
pub fn constraint_name(table: &str, column: &str, constraint: ConstraintType) -> String {
    let table = table.rsplit('.').next().unwrap_or(table);
    format!(
        "{}_{}_{}",
        table,
        column,
        constraint.keyword().to_lowercase().replace(' ', "_")
    )
}

pub fn build_alter_table(alter: &AlterTable) -> Result<String, SQLError> {
    let table = check_identifier(&alter.table, "table")?;

    let clause = match &alter.action {
        AlterAction::AddColumn {
            column,
            data_type,
            default,
            not_null,
        } => {
            let column = check_name(column, "new column")?;
            let data_type = required(data_type, "data type")?;
            parse_data_type(data_type)?;

            let mut clause = format!("ADD COLUMN {} {}", column, data_type);
            if *not_null {
                clause.push_str(" NOT NULL");
            }
            if let Some(default) = non_blank(default) {
                parse_expression(default)?;
                clause.push_str(&format!(" DEFAULT {}", default));
            }
            clause
        }
        AlterAction::DropColumn { column } => {
            format!("DROP COLUMN {}", check_name(column, "column")?)
        }
        AlterAction::RenameColumn { column, new_name } => format!(
            "RENAME COLUMN {} TO {}",
            check_name(column, "column")?,
            check_name(new_name, "new column name")?
        ),
        AlterAction::ChangeColumnType { column, data_type } => {
            let column = check_name(column, "column")?;
            let data_type = required(data_type, "data type")?;
            parse_data_type(data_type)?;
            format!("ALTER COLUMN {} TYPE {}", column, data_type)
        }
        AlterAction::AddConstraint {
            column,
            constraint,
            value,
        } => {
            let column = check_name(column, "constraint column")?;
            let name = constraint_name(table, column, *constraint);

            let body = match constraint {
                ConstraintType::PrimaryKey | ConstraintType::Unique => {
                    format!("{} ({})", constraint, column)
                }
                ConstraintType::ForeignKey => {
                    let (ref_table, ref_column) = split_reference(value)?;
                    format!(
                        "FOREIGN KEY ({}) REFERENCES {}({})",
                        column, ref_table, ref_column
                    )
                }
                ConstraintType::Check => {
                    let expression = required(value, "CHECK expression")?;
                    parse_expression(expression)?;
                    format!("CHECK ({})", expression)
                }
            };

            format!("ADD CONSTRAINT {} {}", name, body)
        }
        AlterAction::DropConstraint { name } => {
            format!("DROP CONSTRAINT {}", check_name(name, "constraint name")?)
        }
        AlterAction::RenameTable { new_name } => {
            format!("RENAME TO {}", check_name(new_name, "new table name")?)
        }
    };

    Ok(format!("ALTER TABLE {} {}", table, clause))
}

/// Splits a `table.column` reference on its first period.
fn split_reference(value: &str) -> Result<(&str, &str), SQLError> {
    let value = required(value, "foreign key reference")?;
    let parts = value.splitn(2, '.').collect::<Vec<_>>();
    if parts.len() != 2 {
        return Err(SQLError::validation(format!(
            "foreign key reference {:?} must look like table.column",
            value
        )));
    }

    Ok((
        check_name(parts[0], "referenced table")?,
        check_name(parts[1], "referenced column")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::builder::testing::assert_parses;

    fn alter(action: AlterAction) -> AlterTable {
        AlterTable {
            table: "results".into(),
            action,
        }
    }

    fn add_constraint(constraint: ConstraintType, value: &str) -> AlterTable {
        alter(AlterAction::AddConstraint {
            column: "user_id".into(),
            constraint,
            value: value.into(),
        })
    }

    #[test]
    fn foreign_key_reference_must_have_two_parts() {
        let err = build_alter_table(&add_constraint(ConstraintType::ForeignKey, "badformat")).unwrap_err();
        assert!(err.message.contains("table.column"));

        let sql = build_alter_table(&add_constraint(ConstraintType::ForeignKey, "users.id")).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE results ADD CONSTRAINT results_user_id_foreign_key \
             FOREIGN KEY (user_id) REFERENCES users(id)"
        );
        assert!(sql.contains("REFERENCES users(id)"));
        assert_parses(&sql);

        assert!(build_alter_table(&add_constraint(ConstraintType::ForeignKey, "users.")).is_err());
        assert!(build_alter_table(&add_constraint(ConstraintType::ForeignKey, "a.b.c")).is_err());
    }

    #[test]
    fn constraint_names_are_derived() {
        assert_eq!(
            constraint_name("users", "id", ConstraintType::PrimaryKey),
            "users_id_primary_key"
        );
        assert_eq!(
            constraint_name("users", "user_id", ConstraintType::Unique),
            "users_user_id_unique"
        );

        let sql = build_alter_table(&add_constraint(ConstraintType::Unique, "")).unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE results ADD CONSTRAINT results_user_id_unique UNIQUE (user_id)"
        );
        assert_parses(&sql);
    }

    #[test]
    fn qualified_table_keeps_constraint_name_bare() {
        assert_eq!(
            constraint_name("public.users", "user_id", ConstraintType::Unique),
            "users_user_id_unique"
        );

        let sql = build_alter_table(&AlterTable {
            table: "public.users".into(),
            action: AlterAction::AddConstraint {
                column: "user_id".into(),
                constraint: ConstraintType::Unique,
                value: String::new(),
            },
        })
        .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE public.users ADD CONSTRAINT users_user_id_unique UNIQUE (user_id)"
        );
        assert_parses(&sql);
    }

    #[test]
    fn check_constraint_needs_valid_expression() {
        assert!(build_alter_table(&add_constraint(ConstraintType::Check, " ")).is_err());
        assert!(build_alter_table(&add_constraint(ConstraintType::Check, "user_id >")).is_err());

        let sql = build_alter_table(&add_constraint(ConstraintType::Check, "user_id > 0")).unwrap();
        assert!(sql.ends_with("ADD CONSTRAINT results_user_id_check CHECK (user_id > 0)"));
        assert_parses(&sql);
    }

    #[test]
    fn add_column_with_modifiers() {
        let sql = build_alter_table(&alter(AlterAction::AddColumn {
            column: "variant".into(),
            data_type: "varchar(16)".into(),
            default: "'A'".into(),
            not_null: true,
        }))
        .unwrap();
        assert_eq!(
            sql,
            "ALTER TABLE results ADD COLUMN variant varchar(16) NOT NULL DEFAULT 'A'"
        );
        assert_parses(&sql);

        let err = build_alter_table(&alter(AlterAction::AddColumn {
            column: "variant".into(),
            data_type: " ".into(),
            default: String::new(),
            not_null: false,
        }))
        .unwrap_err();
        assert!(err.message.contains("data type"));
    }

    #[test]
    fn per_action_requirements() {
        let cases = vec![
            alter(AlterAction::DropColumn { column: " ".into() }),
            alter(AlterAction::RenameColumn {
                column: "rating".into(),
                new_name: "".into(),
            }),
            alter(AlterAction::ChangeColumnType {
                column: "rating".into(),
                data_type: "int; DROP TABLE results".into(),
            }),
            alter(AlterAction::DropConstraint { name: "".into() }),
            alter(AlterAction::RenameTable {
                new_name: "bad name".into(),
            }),
        ];
        for case in cases {
            assert!(build_alter_table(&case).is_err(), "{:?}", case);
        }
    }

    #[test]
    fn simple_actions_render() {
        assert_eq!(
            build_alter_table(&alter(AlterAction::RenameColumn {
                column: "rating".into(),
                new_name: "score".into(),
            }))
            .unwrap(),
            "ALTER TABLE results RENAME COLUMN rating TO score"
        );
        assert_eq!(
            build_alter_table(&alter(AlterAction::ChangeColumnType {
                column: "rating".into(),
                data_type: "smallint".into(),
            }))
            .unwrap(),
            "ALTER TABLE results ALTER COLUMN rating TYPE smallint"
        );
        assert_eq!(
            build_alter_table(&alter(AlterAction::RenameTable {
                new_name: "outcomes".into(),
            }))
            .unwrap(),
            "ALTER TABLE results RENAME TO outcomes"
        );
        assert_eq!(
            build_alter_table(&alter(AlterAction::DropConstraint {
                name: "results_user_id_unique".into(),
            }))
            .unwrap(),
            "ALTER TABLE results DROP CONSTRAINT results_user_id_unique"
        );
    }

    #[test]
    fn constraint_type_parses_labels() {
        assert_eq!("primary key".parse::<ConstraintType>().unwrap(), ConstraintType::PrimaryKey);
        assert_eq!("FOREIGN_KEY".parse::<ConstraintType>().unwrap(), ConstraintType::ForeignKey);
        assert!("EXCLUDE".parse::<ConstraintType>().is_err());
    }
}
