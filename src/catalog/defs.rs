use std::fmt::Display;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Engine type name, e.g. `character varying`. Columns of a user-defined
    /// type carry the type's own name.
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i64>,
    pub is_primary_key: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.is_primary_key)
            .map(|column| column.name.as_str())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeField {
    pub name: String,
    pub data_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Labels in declaration order.
    Enum { labels: Vec<String> },
    /// Fields in declaration order.
    Composite { fields: Vec<CompositeField> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDefinedType {
    pub name: String,
    pub kind: TypeKind,
}

impl Display for UserDefinedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeKind::Enum { labels } => write!(f, "{} ENUM ({})", self.name, labels.join(", ")),
            TypeKind::Composite { fields } => {
                let fields = fields
                    .iter()
                    .map(|field| format!("{} {}", field.name, field.data_type))
                    .collect::<Vec<_>>();
                write!(f, "{} ({})", self.name, fields.join(", "))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}.{} -> {}.{}",
            self.constraint_name,
            self.source_table,
            self.source_column,
            self.target_table,
            self.target_column
        )
    }
}
