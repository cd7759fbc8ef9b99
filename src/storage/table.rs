use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use serde::{Deserialize, Serialize};
use crate::core::{CompareOp, DbError, EntityDef, Result, Row, Value};

/// Rows of one entity keyed by primary key, plus one ordered index per
/// indexed field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    def: EntityDef,
    rows: BTreeMap<i64, Row>,
    /// Next generated key. Only ever grows; `None` once the key space is
    /// used up.
    next_key: Option<i64>,
    indexes: BTreeMap<String, BTreeMap<Value, BTreeSet<i64>>>,
}

impl Table {
    pub fn new(def: EntityDef) -> Self {
        let indexes = def
            .indexes()
            .iter()
            .map(|field| (field.clone(), BTreeMap::new()))
            .collect();
        Self {
            def,
            rows: BTreeMap::new(),
            next_key: Some(1),
            indexes,
        }
    }

    pub fn def(&self) -> &EntityDef {
        &self.def
    }

    /// Insert or replace a row.
    ///
    /// A `NULL` primary key is replaced by the next generated key. Returns
    /// the stored key and the row it replaced, if any. Generating a key
    /// after `i64::MAX` has been used is a `ConstraintViolation`.
    pub fn put(&mut self, mut row: Row) -> Result<(i64, Option<Row>)> {
        let pk = self.def.primary_key_index();
        let key = match row.get(pk).cloned() {
            Some(Value::Null) => {
                let key = self.next_key.ok_or_else(|| {
                    DbError::ConstraintViolation(format!(
                        "Key space of '{}' is exhausted",
                        self.def.name()
                    ))
                })?;
                row[pk] = Value::Integer(key);
                key
            }
            Some(Value::Integer(key)) => key,
            Some(other) => {
                return Err(DbError::TypeMismatch(format!(
                    "Primary key of '{}' must be INTEGER, got {}",
                    self.def.name(),
                    other.type_name()
                )));
            }
            None => {
                return Err(DbError::ConstraintViolation(format!(
                    "Row for '{}' has no primary key value",
                    self.def.name()
                )));
            }
        };
        self.def.validate_row(&row)?;

        self.next_key = match self.next_key {
            Some(next) if key >= next => key.checked_add(1),
            unchanged => unchanged,
        };
        let old = self.rows.insert(key, row);
        if let Some(old) = &old {
            self.remove_from_indexes(key, old);
        }
        self.add_to_indexes(key);
        Ok((key, old))
    }

    pub fn get(&self, key: i64) -> Option<&Row> {
        self.rows.get(&key)
    }

    pub fn contains(&self, key: i64) -> bool {
        self.rows.contains_key(&key)
    }

    pub fn delete(&mut self, key: i64) -> Option<Row> {
        let old = self.rows.remove(&key)?;
        self.remove_from_indexes(key, &old);
        Some(old)
    }

    /// Put back the state a row had before a change, without advancing the
    /// key counter.
    pub fn restore(&mut self, key: i64, previous: Option<Row>) {
        if let Some(current) = self.rows.remove(&key) {
            self.remove_from_indexes(key, &current);
        }
        if let Some(row) = previous {
            self.rows.insert(key, row);
            self.add_to_indexes(key);
        }
    }

    /// Rows in primary-key order. Each call starts a fresh traversal.
    pub fn scan(&self) -> impl Iterator<Item = (i64, &Row)> + '_ {
        self.rows.iter().map(|(key, row)| (*key, row))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn next_key(&self) -> Option<i64> {
        self.next_key
    }

    /// Keys whose `field` satisfies `field op value`, answered from the
    /// index; `None` when `field` is not indexed.
    pub fn lookup(&self, field: &str, op: CompareOp, value: &Value) -> Option<BTreeSet<i64>> {
        let index = self.indexes.get(field)?;
        if value.is_null() {
            return Some(BTreeSet::new());
        }

        // NULL sorts first in the index and never satisfies a comparison.
        let lower_all = Bound::Excluded(Value::Null);
        let range = match op {
            CompareOp::Eq => (Bound::Included(value.clone()), Bound::Included(value.clone())),
            CompareOp::Lt => (lower_all, Bound::Excluded(value.clone())),
            CompareOp::LtEq => (lower_all, Bound::Included(value.clone())),
            CompareOp::Gt => (Bound::Excluded(value.clone()), Bound::Unbounded),
            CompareOp::GtEq => (Bound::Included(value.clone()), Bound::Unbounded),
        };

        Some(
            index
                .range(range)
                // Index keys are totally ordered across types; keep the
                // comparison type-correct.
                .filter(|(indexed, _)| std::mem::discriminant(*indexed) == std::mem::discriminant(value))
                .flat_map(|(_, keys)| keys.iter().copied())
                .collect(),
        )
    }

    fn add_to_indexes(&mut self, key: i64) {
        let Some(row) = self.rows.get(&key) else {
            return;
        };
        for (field, index) in &mut self.indexes {
            if let Some(col) = self.def.field_index(field) {
                index.entry(row[col].clone()).or_default().insert(key);
            }
        }
    }

    fn remove_from_indexes(&mut self, key: i64, row: &Row) {
        for (field, index) in &mut self.indexes {
            if let Some(col) = self.def.field_index(field)
                && let Some(keys) = index.get_mut(&row[col])
            {
                keys.remove(&key);
                if keys.is_empty() {
                    index.remove(&row[col]);
                }
            }
        }
    }
}
