// ============================================================================
// src/executor/query.rs - Query Execution
// ============================================================================
//
// Pipeline, each stage a lazy iterator over tuples borrowed from storage:
//
//   base scan (index or full) → bindings (hash join / cross) → filter
//     → sort (materializes) → offset → limit → records
//
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use crate::core::{DbError, EntityDef, Record, Result, Row, Value};
use crate::evaluator::Tuple;
use crate::query::{JoinKind, Select};
use crate::result::{FromRow, Results};
use super::context::ExecutionContext;
use super::plan::{Binding, QueryPlan};
use super::sort;

type TupleStream<'a> = Box<dyn Iterator<Item = Tuple<'a>> + 'a>;
type ResultStream<'a> = Box<dyn Iterator<Item = Result<Tuple<'a>>> + 'a>;

pub struct QueryExecutor;

impl QueryExecutor {
    pub fn execute<'a, T: FromRow + 'a>(ctx: &ExecutionContext<'a>, select: &Select<T>) -> Result<Results<'a, T>> {
        let plan = QueryPlan::build(select, ctx.catalog)?;
        if ctx.echo {
            info!(target: "rustmemorm::echo", query = %select, "select");
        }
        debug!(
            query = %select,
            index = ?plan.index_probe.as_ref().map(|p| p.field.as_str()),
            bindings = plan.bindings.len(),
            "executing query"
        );

        let tuples = Self::scan_base(ctx, &plan)?;
        let tuples = Self::bind(ctx, &plan, tuples)?;
        let tuples = Self::filter(&plan, tuples);
        let tuples = Self::order(&plan, tuples)?;
        let tuples = Paged::new(tuples, plan.offset, plan.limit);

        let defs: Vec<Arc<EntityDef>> = (0..plan.selected).map(|i| plan.layout.def(i).clone()).collect();
        Ok(Results::new(
            tuples.map(move |tuple| tuple.and_then(|tuple| Self::materialize(&defs, tuple))),
        ))
    }

    fn scan_base<'a>(ctx: &ExecutionContext<'a>, plan: &QueryPlan) -> Result<TupleStream<'a>> {
        let storage = ctx.storage;
        let entity = plan.layout.def(0).name();
        let width = plan.layout.len();

        let rows: Box<dyn Iterator<Item = (i64, &'a Row)> + 'a> = match plan.candidates(storage)? {
            Some(keys) => {
                let mut rows = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(row) = storage.get(entity, key)? {
                        rows.push((key, row));
                    }
                }
                Box::new(rows.into_iter())
            }
            None => storage.scan(entity)?,
        };

        Ok(Box::new(rows.map(move |entry| {
            let mut tuple: Tuple<'a> = vec![None; width];
            tuple[0] = Some(entry);
            tuple
        })))
    }

    fn bind<'a>(ctx: &ExecutionContext<'a>, plan: &QueryPlan, mut tuples: TupleStream<'a>) -> Result<TupleStream<'a>> {
        let storage = ctx.storage;
        for binding in &plan.bindings {
            tuples = match *binding {
                Binding::Cross { slot } => {
                    let right: Vec<(i64, &'a Row)> = storage.scan(plan.layout.def(slot).name())?.collect();
                    Box::new(tuples.flat_map(move |tuple| {
                        right
                            .iter()
                            .map(|&entry| {
                                let mut combined = tuple.clone();
                                combined[slot] = Some(entry);
                                combined
                            })
                            .collect::<Vec<_>>()
                    }))
                }
                Binding::Hash { slot, kind, probe, build_field } => {
                    let mut table: HashMap<&'a Value, Vec<(i64, &'a Row)>> = HashMap::new();
                    for (key, row) in storage.scan(plan.layout.def(slot).name())? {
                        // NULL keys never match.
                        if let Some(value) = row.get(build_field)
                            && !value.is_null()
                        {
                            table.entry(value).or_default().push((key, row));
                        }
                    }
                    Box::new(tuples.flat_map(move |tuple| {
                        let matches = probe
                            .read(&tuple)
                            .filter(|value| !value.is_null())
                            .and_then(|value| table.get(value));
                        match (matches, kind) {
                            (Some(entries), _) => entries
                                .iter()
                                .map(|&entry| {
                                    let mut combined = tuple.clone();
                                    combined[slot] = Some(entry);
                                    combined
                                })
                                .collect(),
                            (None, JoinKind::Inner) => Vec::new(),
                            (None, JoinKind::LeftOuter) => vec![tuple],
                        }
                    }))
                }
            };
        }
        Ok(tuples)
    }

    fn filter<'a>(plan: &QueryPlan, tuples: TupleStream<'a>) -> ResultStream<'a> {
        match plan.filter.clone() {
            Some(predicate) => Box::new(tuples.filter_map(move |tuple| match predicate.evaluate(&tuple) {
                Ok(true) => Some(Ok(tuple)),
                Ok(false) => None,
                Err(err) => Some(Err(err)),
            })),
            None => Box::new(tuples.map(Ok)),
        }
    }

    fn order<'a>(plan: &QueryPlan, tuples: ResultStream<'a>) -> Result<ResultStream<'a>> {
        if plan.sort_keys.is_empty() {
            return Ok(tuples);
        }
        let mut sorted = tuples.collect::<Result<Vec<_>>>()?;
        sort::sort_tuples(&mut sorted, &plan.sort_keys);
        Ok(Box::new(sorted.into_iter().map(Ok)))
    }

    fn materialize<T: FromRow>(defs: &[Arc<EntityDef>], tuple: Tuple<'_>) -> Result<T> {
        let mut records = defs
            .iter()
            .zip(tuple)
            .map(|(def, entry)| entry.map(|(key, row)| Record::from_row(def, key, row)));
        match records.next().flatten() {
            Some(base) => Ok(T::from_row(base, records.collect())),
            None => Err(DbError::ExecutionError("Result row has no base record".into())),
        }
    }
}

/// Offset then limit, counting only successful rows; errors pass through.
struct Paged<I> {
    inner: I,
    skip: usize,
    remaining: Option<usize>,
}

impl<I> Paged<I> {
    fn new(inner: I, skip: usize, remaining: Option<usize>) -> Self {
        Self { inner, skip, remaining }
    }
}

impl<T, I: Iterator<Item = Result<T>>> Iterator for Paged<I> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }
            match self.inner.next()? {
                Ok(_) if self.skip > 0 => self.skip -= 1,
                Ok(item) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(item));
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
