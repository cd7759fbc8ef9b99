use std::cmp::Ordering;
use std::fmt;
use serde::{Deserialize, Serialize};
use super::{DbError, Result, Value};

/// Stored row: one value per field, in definition order.
pub type Row = Vec<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Text,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null) | (DataType::Integer, Value::Integer(_)) | (DataType::Text, Value::Text(_))
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Text => write!(f, "TEXT"),
        }
    }
}

/// Comparison operators understood by filters and index lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Whether `left op right` holds given `left.cmp(right)`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    /// `Option<T>` field: absent values are stored as `NULL`.
    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(DbError::ConstraintViolation(format!(
                    "Field '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(DbError::TypeMismatch(format!(
                "Field '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// `field` references the primary key of `references`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub field: String,
    pub references: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Parent side: the collection of `target` rows whose `foreign_key` points here.
    HasMany,
    /// Child side: the `target` row referenced by this entity's `foreign_key`.
    BelongsTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationshipKind,
    pub target: String,
    /// Always a field of the child entity.
    pub foreign_key: String,
}

/// Declarative entity schema.
///
/// ```
/// use rustmemorm::core::{DataType, EntityDef, Field};
///
/// let hero = EntityDef::new("hero")
///     .field(Field::new("id", DataType::Integer).optional())
///     .field(Field::new("name", DataType::Text))
///     .field(Field::new("age", DataType::Integer).optional())
///     .primary_key("id")
///     .index("name");
/// assert_eq!(hero.field_index("age"), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    name: String,
    fields: Vec<Field>,
    primary_key: String,
    indexes: Vec<String>,
    foreign_keys: Vec<ForeignKey>,
    relationships: Vec<Relationship>,
}

impl EntityDef {
    /// New definition with the conventional `id` primary key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: "id".to_string(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn index(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.indexes.contains(&field) {
            self.indexes.push(field);
        }
        self
    }

    pub fn foreign_key(mut self, field: impl Into<String>, references: impl Into<String>) -> Self {
        self.foreign_keys.push(ForeignKey {
            field: field.into(),
            references: references.into(),
        });
        self
    }

    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relationships.push(Relationship {
            name: name.into(),
            kind: RelationshipKind::HasMany,
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relationships.push(Relationship {
            name: name.into(),
            kind: RelationshipKind::BelongsTo,
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn primary_key_field(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key_index(&self) -> usize {
        // Checked by `validate` before the definition is registered.
        self.field_index(&self.primary_key).unwrap_or(0)
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn require_field(&self, name: &str) -> Result<usize> {
        self.field_index(name)
            .ok_or_else(|| DbError::UnknownField(name.to_string(), self.name.clone()))
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexes.iter().any(|idx| idx == field)
    }

    /// Checks that only need this definition; cross-entity references are
    /// checked by the catalog once every entity is known.
    pub fn validate(&self) -> Result<()> {
        let pk = self.require_field(&self.primary_key)?;
        if self.fields[pk].data_type != DataType::Integer {
            return Err(DbError::TypeMismatch(format!(
                "Primary key '{}.{}' must be INTEGER",
                self.name, self.primary_key
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(DbError::ConstraintViolation(format!(
                    "Field '{}' declared twice in entity '{}'",
                    field.name, self.name
                )));
            }
        }
        for index in &self.indexes {
            self.require_field(index)?;
        }
        for fk in &self.foreign_keys {
            let idx = self.require_field(&fk.field)?;
            if self.fields[idx].data_type != DataType::Integer {
                return Err(DbError::TypeMismatch(format!(
                    "Foreign key '{}.{}' must be INTEGER",
                    self.name, fk.field
                )));
            }
        }
        for rel in &self.relationships {
            if rel.kind == RelationshipKind::BelongsTo {
                self.require_field(&rel.foreign_key)?;
            }
        }
        Ok(())
    }

    /// Validate a full row against the field list.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(DbError::ConstraintViolation(format!(
                "Entity '{}' expects {} values, got {}",
                self.name,
                self.fields.len(),
                row.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(row.iter()) {
            field.validate(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> EntityDef {
        EntityDef::new("hero")
            .field(Field::new("id", DataType::Integer).optional())
            .field(Field::new("name", DataType::Text))
            .field(Field::new("age", DataType::Integer).optional())
            .field(Field::new("team_id", DataType::Integer).optional())
            .index("name")
            .foreign_key("team_id", "team")
    }

    #[test]
    fn test_valid_definition() {
        hero().validate().unwrap();
    }

    #[test]
    fn test_primary_key_must_exist() {
        let err = hero().primary_key("uuid").validate().unwrap_err();
        assert!(matches!(err, DbError::UnknownField(f, e) if f == "uuid" && e == "hero"));
    }

    #[test]
    fn test_primary_key_must_be_integer() {
        let err = hero().primary_key("name").validate().unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn test_index_on_missing_field() {
        let err = hero().index("power").validate().unwrap_err();
        assert!(matches!(err, DbError::UnknownField(..)));
    }

    #[test]
    fn test_validate_row() {
        let def = hero();
        def.validate_row(&vec![Value::Null, "Deadpond".into(), Value::Null, Value::Null])
            .unwrap();

        let err = def
            .validate_row(&vec![Value::Null, Value::Null, Value::Null, Value::Null])
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        let err = def
            .validate_row(&vec![Value::Null, "Deadpond".into(), "old".into(), Value::Null])
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }
}
