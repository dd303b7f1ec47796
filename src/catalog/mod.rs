use self::defs::{ColumnDescriptor, TableDescriptor};
use crate::core::{ErrorKind, SQLError};

pub mod defs;
pub mod introspector;

pub use introspector::Introspector;

/// Tables of one schema as they looked when the snapshot was taken.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub schema: String,
    pub tables: Vec<TableDescriptor>,
}

impl Catalog {
    pub fn new(schema: impl Into<String>, tables: Vec<TableDescriptor>) -> Self {
        Self {
            schema: schema.into(),
            tables,
        }
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.clone()).collect()
    }

    /// Find a table by name. A `schema.table` name only matches this
    /// catalog's schema.
    pub fn find_table_by_name(&self, table_name: &str) -> Option<&TableDescriptor> {
        let name = match table_name.split_once('.') {
            Some((schema, name)) if schema == self.schema => name,
            Some(_) => return None,
            None => table_name,
        };
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn check_table(&self, table_name: &str) -> Result<&TableDescriptor, SQLError> {
        self.find_table_by_name(table_name).ok_or_else(|| {
            SQLError::new(
                ErrorKind::ValidationError,
                format!("table {} does not exist in schema {}", table_name, self.schema),
            )
        })
    }

    pub fn check_column(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<&ColumnDescriptor, SQLError> {
        self.check_table(table_name)?
            .column(column_name)
            .ok_or_else(|| {
                SQLError::new(
                    ErrorKind::ValidationError,
                    format!("column {} does not exist in table {}", column_name, table_name),
                )
            })
    }
}
