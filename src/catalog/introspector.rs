use super::{
    defs::{ColumnDescriptor, CompositeField, ForeignKey, TableDescriptor, TypeKind, UserDefinedType},
    Catalog,
};
use crate::{
    core::{Datum, ErrorKind, QueryResult, Row, SQLError},
    sql::Session,
};

const LIST_TABLES: &str = "\
SELECT table_name::text AS table_name
FROM information_schema.tables
WHERE table_schema::text = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name";

const TABLE_COLUMNS: &str = "\
SELECT c.column_name::text AS column_name,
       CASE WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name::text
            ELSE c.data_type::text END AS data_type,
       c.is_nullable::text AS is_nullable,
       c.column_default::text AS column_default,
       c.character_maximum_length::int8 AS character_maximum_length,
       EXISTS (
           SELECT 1
           FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
            AND tc.table_name = kcu.table_name
           WHERE tc.constraint_type = 'PRIMARY KEY'
             AND tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND kcu.column_name = c.column_name
       ) AS is_primary_key
FROM information_schema.columns c
WHERE c.table_schema::text = $1 AND c.table_name::text = $2
ORDER BY c.ordinal_position";

const ENUM_TYPES: &str = "\
SELECT t.typname::text AS type_name, e.enumlabel::text AS label
FROM pg_type t
JOIN pg_enum e ON e.enumtypid = t.oid
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE n.nspname::text = $1
ORDER BY t.typname, e.enumsortorder";

const COMPOSITE_TYPES: &str = "\
SELECT t.typname::text AS type_name,
       a.attname::text AS field_name,
       format_type(a.atttypid, a.atttypmod) AS field_type
FROM pg_type t
JOIN pg_class c ON c.oid = t.typrelid
JOIN pg_attribute a ON a.attrelid = c.oid
JOIN pg_namespace n ON n.oid = t.typnamespace
WHERE t.typtype = 'c' AND c.relkind = 'c'
  AND a.attnum > 0 AND NOT a.attisdropped
  AND n.nspname::text = $1
ORDER BY t.typname, a.attnum";

const FOREIGN_KEYS: &str = "\
SELECT tc.constraint_name::text AS constraint_name,
       tc.table_name::text AS source_table,
       kcu.column_name::text AS source_column,
       ccu.table_name::text AS target_table,
       ccu.column_name::text AS target_column
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage ccu
  ON ccu.constraint_name = tc.constraint_name
 AND ccu.table_schema = tc.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema::text = $1
ORDER BY tc.table_name, tc.constraint_name";

/// Reads table, column, type and relationship metadata of one schema.
///
/// Every lookup is a fresh read-only query; nothing is cached between calls.
/// Any failure, including the engine refusing a catalog query, surfaces as
/// `ErrorKind::IntrospectionError`.
pub struct Introspector<'a> {
    session: &'a Session,
    schema: String,
}

impl<'a> Introspector<'a> {
    pub fn new(session: &'a Session, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        let schema = match schema.trim() {
            "" => "public".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self { session, schema }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Base table names, ascending. Views are not included.
    pub async fn list_tables(&self) -> Result<Vec<String>, SQLError> {
        let result = self.query(LIST_TABLES, vec![self.schema.as_str().into()]).await?;
        result.rows.iter().map(|row| text(row, "table_name")).collect()
    }

    /// Columns in ordinal order. An unknown table yields no columns.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, SQLError> {
        let result = self
            .query(
                TABLE_COLUMNS,
                vec![self.schema.as_str().into(), table.into()],
            )
            .await?;

        result
            .rows
            .iter()
            .map(|row| {
                Ok(ColumnDescriptor {
                    name: text(row, "column_name")?,
                    data_type: text(row, "data_type")?,
                    nullable: text(row, "is_nullable")?.eq_ignore_ascii_case("YES"),
                    default: optional_text(row, "column_default")?,
                    max_length: optional_int(row, "character_maximum_length")?,
                    is_primary_key: boolean(row, "is_primary_key")?,
                })
            })
            .collect()
    }

    pub async fn describe_table(&self, table: &str) -> Result<TableDescriptor, SQLError> {
        Ok(TableDescriptor {
            name: table.to_string(),
            columns: self.table_columns(table).await?,
        })
    }

    /// Enum and composite types of the schema, ordered by name. Labels and
    /// fields keep their declaration order.
    pub async fn user_defined_types(&self) -> Result<Vec<UserDefinedType>, SQLError> {
        let mut types: Vec<UserDefinedType> = vec![];

        let enums = self.query(ENUM_TYPES, vec![self.schema.as_str().into()]).await?;
        for row in &enums.rows {
            let name = text(row, "type_name")?;
            let label = text(row, "label")?;
            match types.last_mut() {
                Some(UserDefinedType {
                    name: last,
                    kind: TypeKind::Enum { labels },
                }) if *last == name => labels.push(label),
                _ => types.push(UserDefinedType {
                    name,
                    kind: TypeKind::Enum {
                        labels: vec![label],
                    },
                }),
            }
        }

        let composites = self
            .query(COMPOSITE_TYPES, vec![self.schema.as_str().into()])
            .await?;
        for row in &composites.rows {
            let name = text(row, "type_name")?;
            let field = CompositeField {
                name: text(row, "field_name")?,
                data_type: text(row, "field_type")?,
            };
            match types.last_mut() {
                Some(UserDefinedType {
                    name: last,
                    kind: TypeKind::Composite { fields },
                }) if *last == name => fields.push(field),
                _ => types.push(UserDefinedType {
                    name,
                    kind: TypeKind::Composite {
                        fields: vec![field],
                    },
                }),
            }
        }

        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    pub async fn foreign_keys(&self) -> Result<Vec<ForeignKey>, SQLError> {
        let result = self.query(FOREIGN_KEYS, vec![self.schema.as_str().into()]).await?;

        result
            .rows
            .iter()
            .map(|row| {
                Ok(ForeignKey {
                    constraint_name: text(row, "constraint_name")?,
                    source_table: text(row, "source_table")?,
                    source_column: text(row, "source_column")?,
                    target_table: text(row, "target_table")?,
                    target_column: text(row, "target_column")?,
                })
            })
            .collect()
    }

    /// Describes every base table at once, for validating names ahead of
    /// building statements.
    pub async fn snapshot(&self) -> Result<Catalog, SQLError> {
        let mut tables = vec![];
        for table in self.list_tables().await? {
            tables.push(self.describe_table(&table).await?);
        }
        Ok(Catalog::new(self.schema.clone(), tables))
    }

    async fn query(&self, sql: &str, params: Vec<Datum>) -> Result<QueryResult, SQLError> {
        let result = self
            .session
            .execute_with(sql, &params)
            .await
            .map_err(|e| introspection_error(e.to_string()))?;

        match &result.error {
            Some(message) => Err(introspection_error(message)),
            None => Ok(result),
        }
    }
}

fn introspection_error(message: impl AsRef<str>) -> SQLError {
    SQLError::new(ErrorKind::IntrospectionError, message)
}

fn field<'r>(row: &'r Row, column: &str) -> Result<&'r Datum, SQLError> {
    row.get(column)
        .ok_or_else(|| introspection_error(format!("catalog row has no column {}", column)))
}

fn unexpected(column: &str, datum: &Datum) -> SQLError {
    introspection_error(format!(
        "catalog column {} holds an unexpected {} value",
        column,
        datum.type_name()
    ))
}

fn text(row: &Row, column: &str) -> Result<String, SQLError> {
    match field(row, column)? {
        Datum::String(value) => Ok(value.clone()),
        other => Err(unexpected(column, other)),
    }
}

fn optional_text(row: &Row, column: &str) -> Result<Option<String>, SQLError> {
    match field(row, column)? {
        Datum::Null => Ok(None),
        Datum::String(value) => Ok(Some(value.clone())),
        other => Err(unexpected(column, other)),
    }
}

fn optional_int(row: &Row, column: &str) -> Result<Option<i64>, SQLError> {
    match field(row, column)? {
        Datum::Null => Ok(None),
        Datum::Int(value) => Ok(Some(*value)),
        other => Err(unexpected(column, other)),
    }
}

fn boolean(row: &Row, column: &str) -> Result<bool, SQLError> {
    match field(row, column)? {
        Datum::Boolean(value) => Ok(*value),
        other => Err(unexpected(column, other)),
    }
}
