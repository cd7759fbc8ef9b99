use crate::core::{DbError, Record, Result};

/// Shape of one query result row, built from the selected records in order.
/// The first selected entity is the scan base and is always present.
pub trait FromRow: Sized {
    fn from_row(base: Record, rest: Vec<Option<Record>>) -> Self;
}

impl FromRow for Record {
    fn from_row(base: Record, _rest: Vec<Option<Record>>) -> Self {
        base
    }
}

impl FromRow for (Record, Option<Record>) {
    fn from_row(base: Record, rest: Vec<Option<Record>>) -> Self {
        (base, rest.into_iter().next().flatten())
    }
}

impl FromRow for Vec<Option<Record>> {
    fn from_row(base: Record, rest: Vec<Option<Record>>) -> Self {
        std::iter::once(Some(base)).chain(rest).collect()
    }
}

/// Lazily produced query results.
///
/// Iterating yields `Result<T>`; the terminal helpers consume the iterator.
pub struct Results<'a, T> {
    rows: Box<dyn Iterator<Item = Result<T>> + 'a>,
}

impl<'a, T> Results<'a, T> {
    pub(crate) fn new(rows: impl Iterator<Item = Result<T>> + 'a) -> Self {
        Self { rows: Box::new(rows) }
    }

    /// First row, if any.
    pub fn first(mut self) -> Result<Option<T>> {
        self.rows.next().transpose()
    }

    /// Exactly one row, or `NoResultFound` / `MultipleResultsFound`.
    pub fn one(mut self) -> Result<T> {
        let row = match self.rows.next() {
            Some(row) => row?,
            None => return Err(DbError::NoResultFound),
        };
        match self.rows.next() {
            None => Ok(row),
            Some(Ok(_)) => Err(DbError::MultipleResultsFound),
            Some(Err(err)) => Err(err),
        }
    }

    pub fn all(self) -> Result<Vec<T>> {
        self.rows.collect()
    }
}

impl<T> Iterator for Results<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}
