// ============================================================================
// src/executor/plan.rs - Query Planning
// ============================================================================
//
// Turns a `Select` description into a plan over tuple slots:
//
//   slot 0            base entity (first selected), full or index scan
//   slots 1..n        remaining selected entities, then joined-only entities
//
// Every slot after the base is bound either by a hash join (when a join
// clause names it) or by a cross product. All entity, column and join
// references are checked here, before any row is read.
//
// ============================================================================

use std::collections::BTreeSet;
use crate::core::{CompareOp, DbError, Result, Value};
use crate::evaluator::{comparison, BoundOperand, BoundPredicate, Layout, Slot};
use crate::query::{ColumnRef, Join, JoinKind, Select};
use crate::storage::{Catalog, StorageEngine};
use super::sort::SortKey;

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Pair every tuple with every row of `slot`.
    Cross { slot: usize },
    /// Equality join: rows of `slot` whose `build_field` equals `probe`.
    Hash {
        slot: usize,
        kind: JoinKind,
        probe: Slot,
        build_field: usize,
    },
}

/// Index lookup used to pick base candidates instead of a full scan.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexProbe {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub layout: Layout,
    pub selected: usize,
    pub bindings: Vec<Binding>,
    pub filter: Option<BoundPredicate>,
    pub index_probe: Option<IndexProbe>,
    pub sort_keys: Vec<SortKey>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl QueryPlan {
    pub fn build<T>(select: &Select<T>, catalog: &Catalog) -> Result<Self> {
        if select.entities().is_empty() {
            return Err(DbError::ExecutionError("Query selects no entity".into()));
        }
        Self::check_references(select, catalog)?;

        let mut layout = Layout::new();
        for name in select.entities() {
            if layout.position(name).is_some() {
                return Err(DbError::ExecutionError(format!(
                    "Entity '{}' is selected more than once",
                    name
                )));
            }
            layout.push(catalog.describe(name)?.clone());
        }
        let selected = layout.len();
        for join in select.joins() {
            if layout.position(&join.entity).is_none() {
                layout.push(catalog.describe(&join.entity)?.clone());
            }
        }

        let mut joins: Vec<Option<&Join>> = vec![None; layout.len()];
        for join in select.joins() {
            let slot = layout.position(&join.entity).unwrap_or_default();
            if slot == 0 {
                return Err(DbError::ExecutionError(format!(
                    "Cannot join '{}': it is the base entity of the query",
                    join.entity
                )));
            }
            if joins[slot].is_some() {
                return Err(DbError::ExecutionError(format!(
                    "Entity '{}' is joined more than once",
                    join.entity
                )));
            }
            joins[slot] = Some(join);
        }

        let mut bindings = Vec::with_capacity(layout.len().saturating_sub(1));
        for (slot, join) in joins.iter().enumerate().skip(1) {
            bindings.push(match join {
                None => Binding::Cross { slot },
                Some(join) => {
                    let (probe, build_field) = match &join.on {
                        Some((left, right)) => Self::explicit_condition(&layout, slot, left, right)?,
                        None => Self::foreign_key_condition(&layout, slot)?,
                    };
                    Binding::Hash {
                        slot,
                        kind: join.kind,
                        probe,
                        build_field,
                    }
                }
            });
        }

        let filter = if select.predicates().is_empty() {
            None
        } else {
            let bound = select
                .predicates()
                .iter()
                .map(|p| layout.bind(p))
                .collect::<Result<Vec<_>>>()?;
            Some(BoundPredicate::And(bound))
        };
        let index_probe = filter.as_ref().and_then(|f| Self::index_probe(&layout, f));

        let sort_keys = select
            .ordering()
            .iter()
            .map(|order| Ok(SortKey::new(layout.resolve(&order.column)?.0, order.descending)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layout,
            selected,
            bindings,
            filter,
            index_probe,
            sort_keys,
            offset: select.offset_value().unwrap_or(0),
            limit: select.limit_value(),
        })
    }

    /// Unknown entities and fields are reported before join problems.
    fn check_references<T>(select: &Select<T>, catalog: &Catalog) -> Result<()> {
        let mut columns: Vec<&ColumnRef> = Vec::new();
        for predicate in select.predicates() {
            columns.extend(predicate.columns());
        }
        for join in select.joins() {
            catalog.describe(&join.entity)?;
            if let Some((left, right)) = &join.on {
                columns.push(left);
                columns.push(right);
            }
        }
        columns.extend(select.ordering().iter().map(|o| &o.column));
        for name in select.entities() {
            catalog.describe(name)?;
        }
        for column in columns {
            catalog.describe(&column.entity)?.require_field(&column.field)?;
        }
        Ok(())
    }

    fn explicit_condition(layout: &Layout, slot: usize, left: &ColumnRef, right: &ColumnRef) -> Result<(Slot, usize)> {
        let (left_slot, left_type) = layout.resolve(left)?;
        let (right_slot, right_type) = layout.resolve(right)?;
        comparison::check_columns(&left.to_string(), left_type, &right.to_string(), right_type)?;

        if right_slot.entity == slot && left_slot.entity < slot {
            Ok((left_slot, right_slot.field))
        } else if left_slot.entity == slot && right_slot.entity < slot {
            Ok((right_slot, left_slot.field))
        } else {
            Err(DbError::ExecutionError(format!(
                "Join condition {} = {} must link '{}' to an entity bound before it",
                left,
                right,
                layout.def(slot).name()
            )))
        }
    }

    /// First declared foreign key between `slot` and an earlier slot, in
    /// either direction.
    fn foreign_key_condition(layout: &Layout, slot: usize) -> Result<(Slot, usize)> {
        let joined = layout.def(slot);
        for earlier in 0..slot {
            let bound = layout.def(earlier);
            if let Some(fk) = bound.foreign_keys().iter().find(|fk| fk.references == joined.name()) {
                let probe = Slot { entity: earlier, field: bound.require_field(&fk.field)? };
                return Ok((probe, joined.primary_key_index()));
            }
            if let Some(fk) = joined.foreign_keys().iter().find(|fk| fk.references == bound.name()) {
                let probe = Slot { entity: earlier, field: bound.primary_key_index() };
                return Ok((probe, joined.require_field(&fk.field)?));
            }
        }
        Err(DbError::ExecutionError(format!(
            "Don't know how to join '{}': no foreign key links it to an entity already in the query",
            joined.name()
        )))
    }

    /// A top-level `base.field op literal` clause on an indexed field.
    fn index_probe(layout: &Layout, filter: &BoundPredicate) -> Option<IndexProbe> {
        let base = layout.def(0);
        filter.conjuncts().into_iter().find_map(|clause| match clause {
            BoundPredicate::Compare {
                left,
                op,
                right: BoundOperand::Value(value),
            } if left.entity == 0 => {
                let field = &base.fields()[left.field].name;
                base.is_indexed(field).then(|| IndexProbe {
                    field: field.clone(),
                    op: *op,
                    value: value.clone(),
                })
            }
            _ => None,
        })
    }

    /// Base candidates from the index, or `None` for a full scan.
    pub fn candidates(&self, storage: &dyn StorageEngine) -> Result<Option<BTreeSet<i64>>> {
        match &self.index_probe {
            Some(probe) => storage.lookup(self.layout.def(0).name(), &probe.field, probe.op, &probe.value),
            None => Ok(None),
        }
    }
}
