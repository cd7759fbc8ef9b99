use rustmemorm::{DataType, EntityDef, Field};

pub const HERO: &str = "hero";
pub const TEAM: &str = "team";

fn hero_fields() -> EntityDef {
    EntityDef::new(HERO)
        .field(Field::new("id", DataType::Integer).optional())
        .field(Field::new("name", DataType::Text))
        .field(Field::new("secret_name", DataType::Text))
        .field(Field::new("age", DataType::Integer).optional())
        .primary_key("id")
        .index("name")
}

/// Hero on its own.
pub fn hero() -> EntityDef {
    hero_fields()
}

/// Hero with an indexed age and a foreign key to its team.
pub fn hero_on_team() -> EntityDef {
    hero_fields()
        .field(Field::new("team_id", DataType::Integer).optional())
        .index("age")
        .foreign_key("team_id", TEAM)
}

pub fn team() -> EntityDef {
    EntityDef::new(TEAM)
        .field(Field::new("id", DataType::Integer).optional())
        .field(Field::new("name", DataType::Text))
        .field(Field::new("headquarters", DataType::Text))
        .primary_key("id")
        .index("name")
}

/// Team and hero with navigable relationships in both directions.
pub fn related() -> (EntityDef, EntityDef) {
    (
        team().has_many("heroes", HERO, "team_id"),
        hero_on_team().belongs_to("team", TEAM, "team_id"),
    )
}
