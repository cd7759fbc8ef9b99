use std::fmt;
use std::marker::PhantomData;
use crate::core::Record;
use super::expr::{ColumnRef, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub entity: String,
    pub kind: JoinKind,
    /// Explicit equality condition; `None` means "use the declared foreign key".
    pub on: Option<(ColumnRef, ColumnRef)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub descending: bool,
}

/// Structured query description. `T` is what each result row turns into.
///
/// ```
/// use rustmemorm::{col, or_, select};
///
/// let age = col("hero", "age");
/// let stmt = select("hero").where_(or_([age.le(30), age.ge(40)])).offset(2).limit(2);
/// assert_eq!(
///     stmt.to_string(),
///     "SELECT hero WHERE (hero.age <= 30 OR hero.age >= 40) LIMIT 2 OFFSET 2"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Select<T> {
    entities: Vec<String>,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
    _row: PhantomData<fn() -> T>,
}

/// Query one entity; rows are its records.
pub fn select(entity: &str) -> Select<Record> {
    Select::new(vec![entity.to_string()])
}

/// Query two entities; rows are `(left, right)` pairs, `right` absent for
/// unmatched rows of a left-outer join.
pub fn select_pair(left: &str, right: &str) -> Select<(Record, Option<Record>)> {
    Select::new(vec![left.to_string(), right.to_string()])
}

/// Query any number of entities; rows hold one slot per entity.
pub fn select_tuple(entities: &[&str]) -> Select<Vec<Option<Record>>> {
    Select::new(entities.iter().map(|e| e.to_string()).collect())
}

impl<T> Select<T> {
    fn new(entities: Vec<String>) -> Self {
        Self {
            entities,
            joins: Vec::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            _row: PhantomData,
        }
    }

    pub fn where_(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Inner join on the foreign key declared between `entity` and an
    /// entity already in the query.
    pub fn join(self, entity: &str) -> Self {
        self.push_join(entity, JoinKind::Inner, None)
    }

    pub fn outer_join(self, entity: &str) -> Self {
        self.push_join(entity, JoinKind::LeftOuter, None)
    }

    pub fn join_on(self, entity: &str, left: ColumnRef, right: ColumnRef) -> Self {
        self.push_join(entity, JoinKind::Inner, Some((left, right)))
    }

    pub fn outer_join_on(self, entity: &str, left: ColumnRef, right: ColumnRef) -> Self {
        self.push_join(entity, JoinKind::LeftOuter, Some((left, right)))
    }

    fn push_join(mut self, entity: &str, kind: JoinKind, on: Option<(ColumnRef, ColumnRef)>) -> Self {
        self.joins.push(Join {
            entity: entity.to_string(),
            kind,
            on,
        });
        self
    }

    pub fn order_by(mut self, column: ColumnRef) -> Self {
        self.order_by.push(OrderBy { column, descending: false });
        self
    }

    pub fn order_by_desc(mut self, column: ColumnRef) -> Self {
        self.order_by.push(OrderBy { column, descending: true });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }
}

impl<T> fmt::Display for Select<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {}", self.entities.join(", "))?;
        for join in &self.joins {
            let kind = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::LeftOuter => "LEFT OUTER JOIN",
            };
            write!(f, " {} {}", kind, join.entity)?;
            if let Some((left, right)) = &join.on {
                write!(f, " ON {} = {}", left, right)?;
            }
        }
        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self.predicates.iter().map(ToString::to_string).collect();
            write!(f, " WHERE {}", clauses.join(" AND "))?;
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{}{}", o.column, if o.descending { " DESC" } else { "" }))
                .collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}
