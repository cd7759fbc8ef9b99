use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use super::{DbError, EntityDef, Result, Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Constructed, never staged.
    Transient,
    /// Staged in a session, not yet committed.
    Pending,
    /// Present in storage as of the last commit or read.
    Persistent,
    /// Removed by a committed delete.
    Deleted,
}

#[derive(Debug)]
struct RecordData {
    entity: String,
    values: Vec<(String, Value)>,
    key: Option<i64>,
    state: RecordState,
    links: Vec<(String, Record)>,
}

/// One entity instance.
///
/// `Record` is a shared handle: clones point at the same instance, which is
/// how a commit hands generated keys back to the caller's value and how
/// `refresh` overwrites it in place.
///
/// ```
/// use rustmemorm::Record;
///
/// let hero = Record::new("hero").with("name", "Deadpond").with("secret_name", "Dive Wilson");
/// let alias = hero.clone();
/// alias.set("name", "Deadpool");
/// assert_eq!(hero.get("name"), Some("Deadpool".into()));
/// assert_eq!(hero.id(), None);
/// ```
#[derive(Clone)]
pub struct Record {
    inner: Rc<RefCell<RecordData>>,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RecordData {
                entity: entity.into(),
                values: Vec::new(),
                key: None,
                state: RecordState::Transient,
                links: Vec::new(),
            })),
        }
    }

    pub fn with(self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&self, field: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut data = self.inner.borrow_mut();
        match data.values.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => data.values.push((field.to_string(), value)),
        }
    }

    /// Field value; `None` when the field was never set on this instance.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner
            .borrow()
            .values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.clone())
    }

    pub fn entity(&self) -> String {
        self.inner.borrow().entity.clone()
    }

    /// Persistent primary key, if the record has been committed or loaded.
    pub fn id(&self) -> Option<i64> {
        self.inner.borrow().key
    }

    pub fn state(&self) -> RecordState {
        self.inner.borrow().state
    }

    /// Point a `belongs_to` relationship at `target`.
    ///
    /// The foreign key is filled in at commit time, after `target` has a
    /// key; an unsaved `target` is inserted by the same commit.
    pub fn link(&self, relationship: &str, target: &Record) {
        let mut data = self.inner.borrow_mut();
        data.links.retain(|(name, _)| name != relationship);
        data.links.push((relationship.to_string(), target.clone()));
    }

    pub fn same_instance(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn from_row(def: &EntityDef, key: i64, row: &Row) -> Self {
        let record = Self::new(def.name());
        record.overwrite(def, key, row);
        record
    }

    /// Replace every field with the stored row and mark the record persistent.
    pub(crate) fn overwrite(&self, def: &EntityDef, key: i64, row: &Row) {
        let mut data = self.inner.borrow_mut();
        data.values = def
            .fields()
            .iter()
            .zip(row.iter())
            .map(|(field, value)| (field.name.clone(), value.clone()))
            .collect();
        data.key = Some(key);
        data.state = RecordState::Persistent;
    }

    /// Lay the record out in definition order; unset fields become `NULL`.
    pub(crate) fn to_row(&self, def: &EntityDef) -> Result<Row> {
        let data = self.inner.borrow();
        if data.entity != def.name() {
            return Err(DbError::TypeMismatch(format!(
                "Record of '{}' used as '{}'",
                data.entity,
                def.name()
            )));
        }
        if let Some((name, _)) = data
            .values
            .iter()
            .find(|(name, _)| def.field_index(name).is_none())
        {
            return Err(DbError::UnknownField(name.clone(), data.entity.clone()));
        }
        Ok(def
            .fields()
            .iter()
            .map(|field| {
                data.values
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect())
    }

    pub(crate) fn set_state(&self, state: RecordState) {
        self.inner.borrow_mut().state = state;
    }

    pub(crate) fn links(&self) -> Vec<(String, Record)> {
        self.inner.borrow().links.clone()
    }

    pub(crate) fn clear_links(&self) {
        self.inner.borrow_mut().links.clear();
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        if self.same_instance(other) {
            return true;
        }
        let (a, b) = (self.inner.borrow(), other.inner.borrow());
        a.entity == b.entity && a.key == b.key && a.values == b.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        f.debug_struct("Record")
            .field("entity", &data.entity)
            .field("key", &data.key)
            .field("state", &data.state)
            .field("values", &data.values)
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.borrow();
        let fields: Vec<String> = data
            .values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        write!(f, "{}({})", data.entity, fields.join(", "))
    }
}
