use std::fmt;
use crate::core::{CompareOp, Value};

/// `entity.field`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub entity: String,
    pub field: String,
}

pub fn col(entity: &str, field: &str) -> ColumnRef {
    ColumnRef {
        entity: entity.to_string(),
        field: field.to_string(),
    }
}

impl ColumnRef {
    fn compare(&self, op: CompareOp, right: impl Into<Operand>) -> Predicate {
        Predicate::Compare {
            left: self.clone(),
            op,
            right: right.into(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn eq(&self, right: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Eq, right)
    }

    pub fn lt(&self, right: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Lt, right)
    }

    pub fn le(&self, right: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::LtEq, right)
    }

    pub fn gt(&self, right: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::Gt, right)
    }

    pub fn ge(&self, right: impl Into<Operand>) -> Predicate {
        self.compare(CompareOp::GtEq, right)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

/// Right-hand side of a comparison: a literal or another column.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Column(ColumnRef),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Value(value.into())
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Value(value.into())
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Value(value.into())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Value(value.into())
    }
}

impl From<Option<i64>> for Operand {
    fn from(value: Option<i64>) -> Self {
        Operand::Value(value.into())
    }
}

impl From<ColumnRef> for Operand {
    fn from(column: ColumnRef) -> Self {
        Operand::Column(column)
    }
}

impl From<&ColumnRef> for Operand {
    fn from(column: &ColumnRef) -> Self {
        Operand::Column(column.clone())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Column(column) => write!(f, "{}", column),
        }
    }
}

/// Filter expression. Clauses added with successive `where_` calls are
/// ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        left: ColumnRef,
        op: CompareOp,
        right: Operand,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Disjunction of `predicates`. A single predicate behaves exactly like the
/// predicate on its own.
pub fn or_(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::Or(predicates.into_iter().collect())
}

pub fn and_(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::And(predicates.into_iter().collect())
}

impl Predicate {
    /// Every column the predicate reads, left to right.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            Predicate::Compare { left, right, .. } => {
                let mut columns = vec![left];
                if let Operand::Column(right) = right {
                    columns.push(right);
                }
                columns
            }
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().flat_map(Predicate::columns).collect()
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Predicate::And(children) | Predicate::Or(children) => {
                let joiner = if matches!(self, Predicate::And(_)) { " AND " } else { " OR " };
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(joiner))
            }
        }
    }
}
