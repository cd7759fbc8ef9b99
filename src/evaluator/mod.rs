pub mod comparison;

use std::sync::Arc;
use crate::core::{CompareOp, DataType, DbError, EntityDef, Result, Row, Value};
use crate::query::{ColumnRef, Operand, Predicate};

/// One candidate result: a `(key, row)` per bound entity, `None` where a
/// left-outer join found no match.
pub type Tuple<'a> = Vec<Option<(i64, &'a Row)>>;

/// Position of a column inside a [`Tuple`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub entity: usize,
    pub field: usize,
}

impl Slot {
    pub fn read<'a>(&self, tuple: &Tuple<'a>) -> Option<&'a Value> {
        tuple
            .get(self.entity)
            .copied()
            .flatten()
            .and_then(|(_, row)| row.get(self.field))
    }
}

/// Entities bound by a query, in tuple order.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    entities: Vec<Arc<EntityDef>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, def: Arc<EntityDef>) -> usize {
        self.entities.push(def);
        self.entities.len() - 1
    }

    pub fn position(&self, entity: &str) -> Option<usize> {
        self.entities.iter().position(|def| def.name() == entity)
    }

    /// Panics if `position` was not handed out by this layout.
    pub fn def(&self, position: usize) -> &Arc<EntityDef> {
        &self.entities[position]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn resolve(&self, column: &ColumnRef) -> Result<(Slot, DataType)> {
        let entity = self.position(&column.entity).ok_or_else(|| {
            DbError::ExecutionError(format!(
                "Column {} refers to entity '{}', which is not part of the query",
                column, column.entity
            ))
        })?;
        let def = &self.entities[entity];
        let field = def.require_field(&column.field)?;
        Ok((Slot { entity, field }, def.fields()[field].data_type))
    }

    /// Resolve every column of `predicate` and check operand types.
    pub fn bind(&self, predicate: &Predicate) -> Result<BoundPredicate> {
        match predicate {
            Predicate::Compare { left, op, right } => {
                let (left_slot, left_type) = self.resolve(left)?;
                let right = match right {
                    Operand::Value(value) => {
                        comparison::check_literal(&left.to_string(), left_type, value)?;
                        BoundOperand::Value(value.clone())
                    }
                    Operand::Column(column) => {
                        let (slot, right_type) = self.resolve(column)?;
                        comparison::check_columns(&left.to_string(), left_type, &column.to_string(), right_type)?;
                        BoundOperand::Column(slot)
                    }
                };
                Ok(BoundPredicate::Compare { left: left_slot, op: *op, right })
            }
            Predicate::And(children) => Ok(BoundPredicate::And(self.bind_all(children)?)),
            Predicate::Or(children) => Ok(BoundPredicate::Or(self.bind_all(children)?)),
        }
    }

    fn bind_all(&self, predicates: &[Predicate]) -> Result<Vec<BoundPredicate>> {
        predicates.iter().map(|p| self.bind(p)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundOperand {
    Value(Value),
    Column(Slot),
}

/// A predicate whose columns are resolved to tuple slots.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    Compare {
        left: Slot,
        op: CompareOp,
        right: BoundOperand,
    },
    And(Vec<BoundPredicate>),
    Or(Vec<BoundPredicate>),
}

impl BoundPredicate {
    pub fn evaluate(&self, tuple: &Tuple<'_>) -> Result<bool> {
        match self {
            BoundPredicate::Compare { left, op, right } => {
                let Some(left) = left.read(tuple) else {
                    return Ok(false);
                };
                let right = match right {
                    BoundOperand::Value(value) => value,
                    BoundOperand::Column(slot) => match slot.read(tuple) {
                        Some(value) => value,
                        None => return Ok(false),
                    },
                };
                comparison::compare(left, *op, right)
            }
            BoundPredicate::And(children) => {
                for child in children {
                    if !child.evaluate(tuple)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BoundPredicate::Or(children) => {
                for child in children {
                    if child.evaluate(tuple)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Top-level conjuncts. A single-child OR counts as its child.
    pub fn conjuncts(&self) -> Vec<&BoundPredicate> {
        match self {
            BoundPredicate::And(children) => children.iter().flat_map(BoundPredicate::conjuncts).collect(),
            BoundPredicate::Or(children) if children.len() == 1 => children[0].conjuncts(),
            other => vec![other],
        }
    }
}
