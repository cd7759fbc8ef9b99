use std::collections::BTreeMap;
use std::sync::Arc;
use crate::core::{DbError, EntityDef, ForeignKey, Relationship, RelationshipKind, Result};

/// Schema registry: entity definitions only, no data.
///
/// Immutable once built; `define` returns a new catalog that shares the
/// unchanged definitions, so clones are cheap.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entities: Arc<BTreeMap<String, Arc<EntityDef>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning the extended catalog.
    pub fn define(self, def: EntityDef) -> Result<Self> {
        let name = def.name().to_string();

        if self.entities.contains_key(&name) {
            return Err(DbError::DuplicateEntity(name));
        }
        def.validate()?;

        let mut entities = (*self.entities).clone();
        entities.insert(name, Arc::new(def));

        Ok(Self {
            entities: Arc::new(entities),
        })
    }

    pub fn describe(&self, name: &str) -> Result<&Arc<EntityDef>> {
        self.entities
            .get(name)
            .ok_or_else(|| DbError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDef>> {
        self.entities.values()
    }

    pub fn relationship(&self, entity: &str, name: &str) -> Result<&Relationship> {
        self.describe(entity)?.relationship(name).ok_or_else(|| {
            DbError::UnknownField(name.to_string(), entity.to_string())
        })
    }

    /// Every `(entity, foreign key)` whose foreign key points at `target`.
    pub fn referencing(&self, target: &str) -> Vec<(&EntityDef, &ForeignKey)> {
        self.entities
            .values()
            .flat_map(|def| {
                def.foreign_keys()
                    .iter()
                    .filter(move |fk| fk.references == target)
                    .map(move |fk| (def.as_ref(), fk))
            })
            .collect()
    }

    /// Cross-entity checks, run once all definitions are registered.
    pub fn validate(&self) -> Result<()> {
        for def in self.entities.values() {
            for fk in def.foreign_keys() {
                self.describe(&fk.references)?;
            }
            for rel in def.relationships() {
                let target = self.describe(&rel.target)?;
                let (child, parent) = match rel.kind {
                    RelationshipKind::BelongsTo => (def.as_ref(), target.as_ref()),
                    RelationshipKind::HasMany => (target.as_ref(), def.as_ref()),
                };
                let declared = child
                    .foreign_keys()
                    .iter()
                    .any(|fk| fk.field == rel.foreign_key && fk.references == parent.name());
                if !declared {
                    return Err(DbError::ConstraintViolation(format!(
                        "Relationship '{}.{}' needs foreign key '{}.{}' referencing '{}'",
                        def.name(),
                        rel.name,
                        child.name(),
                        rel.foreign_key,
                        parent.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Field};

    fn team() -> EntityDef {
        EntityDef::new("team")
            .field(Field::new("id", DataType::Integer).optional())
            .field(Field::new("name", DataType::Text))
            .has_many("heroes", "hero", "team_id")
    }

    fn hero() -> EntityDef {
        EntityDef::new("hero")
            .field(Field::new("id", DataType::Integer).optional())
            .field(Field::new("name", DataType::Text))
            .field(Field::new("team_id", DataType::Integer).optional())
            .foreign_key("team_id", "team")
            .belongs_to("team", "team", "team_id")
    }

    #[test]
    fn test_define_and_describe() {
        let catalog = Catalog::new().define(team()).unwrap();
        assert_eq!(catalog.describe("team").unwrap().name(), "team");
        assert!(matches!(catalog.describe("hero"), Err(DbError::UnknownEntity(n)) if n == "hero"));
    }

    #[test]
    fn test_define_is_copy_on_write() {
        let before = Catalog::new().define(team()).unwrap();
        let after = before.clone().define(hero()).unwrap();
        assert!(!before.contains("hero"));
        assert!(after.contains("hero"));
    }

    #[test]
    fn test_duplicate_entity() {
        let catalog = Catalog::new().define(team()).unwrap();
        let err = catalog.define(team()).unwrap_err();
        assert!(matches!(err, DbError::DuplicateEntity(n) if n == "team"));
    }

    #[test]
    fn test_validate_requires_targets() {
        let catalog = Catalog::new().define(hero()).unwrap();
        assert!(matches!(catalog.validate(), Err(DbError::UnknownEntity(n)) if n == "team"));

        let catalog = catalog.define(team()).unwrap();
        catalog.validate().unwrap();
    }

    #[test]
    fn test_relationship_without_foreign_key() {
        let orphan = EntityDef::new("sidekick")
            .field(Field::new("id", DataType::Integer).optional())
            .field(Field::new("team_id", DataType::Integer).optional())
            .belongs_to("team", "team", "team_id");
        let catalog = Catalog::new().define(team()).unwrap().define(orphan).unwrap();
        assert!(matches!(catalog.validate(), Err(DbError::ConstraintViolation(_))));
    }

    #[test]
    fn test_referencing() {
        let catalog = Catalog::new().define(team()).unwrap().define(hero()).unwrap();
        let refs = catalog.referencing("team");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0.name(), "hero");
        assert_eq!(refs[0].1.field, "team_id");
    }
}
