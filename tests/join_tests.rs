use rustmemorm::{
    DataType, DbError, Engine, EntityDef, Field, Record, Value, col, select, select_pair, select_tuple,
};

fn setup_engine() -> Engine {
    let mut engine = Engine::memory().unwrap();
    engine
        .define(
            EntityDef::new("team")
                .field(Field::new("id", DataType::Integer).optional())
                .field(Field::new("name", DataType::Text))
                .field(Field::new("headquarters", DataType::Text))
                .index("name"),
        )
        .unwrap();
    engine
        .define(
            EntityDef::new("hero")
                .field(Field::new("id", DataType::Integer).optional())
                .field(Field::new("name", DataType::Text))
                .field(Field::new("secret_name", DataType::Text))
                .field(Field::new("age", DataType::Integer).optional())
                .field(Field::new("team_id", DataType::Integer).optional())
                .index("name")
                .index("age")
                .foreign_key("team_id", "team"),
        )
        .unwrap();
    engine.create_all().unwrap();

    let mut session = engine.session();
    let preventers = Record::new("team").with("name", "Preventers").with("headquarters", "Sharp Tower");
    let z_force = Record::new("team").with("name", "Z-Force").with("headquarters", "Sister Margaret's Bar");
    session.add(&preventers).unwrap();
    session.add(&z_force).unwrap();
    session.commit().unwrap();

    let heroes = [
        ("Deadpond", "Dive Wilson", None, z_force.id()),
        ("Rusty-Man", "Tommy Sharp", Some(48), preventers.id()),
        ("Spider-Boy", "Pedro Parqueador", None, None),
        ("Dummy", "Dummy", Some(1), z_force.id()),
    ];
    for (name, secret_name, age, team_id) in heroes {
        let hero = Record::new("hero")
            .with("name", name)
            .with("secret_name", secret_name)
            .with("age", age)
            .with("team_id", team_id);
        session.add(&hero).unwrap();
    }
    session.commit().unwrap();
    drop(session);
    engine
}

fn name(record: &Record) -> String {
    record.get("name").and_then(|v| v.as_str().map(str::to_string)).unwrap()
}

fn pairs(rows: Vec<(Record, Option<Record>)>) -> Vec<(String, Option<String>)> {
    rows.iter().map(|(hero, team)| (name(hero), team.as_ref().map(name))).collect()
}

#[test]
fn test_join_expressed_as_filter() {
    let mut engine = setup_engine();
    let session = engine.session();
    let statement = select_pair("hero", "team").where_(col("hero", "team_id").eq(col("team", "id")));
    let rows = session.exec(&statement).unwrap().all().unwrap();
    assert_eq!(
        pairs(rows),
        vec![
            ("Deadpond".to_string(), Some("Z-Force".to_string())),
            ("Rusty-Man".to_string(), Some("Preventers".to_string())),
            ("Dummy".to_string(), Some("Z-Force".to_string())),
        ]
    );
}

#[test]
fn test_inner_join_on_foreign_key() {
    let mut engine = setup_engine();
    let session = engine.session();
    let joined = session.exec(&select_pair("hero", "team").join("team")).unwrap().all().unwrap();
    let filtered = session
        .exec(&select_pair("hero", "team").where_(col("hero", "team_id").eq(col("team", "id"))))
        .unwrap()
        .all()
        .unwrap();
    assert_eq!(pairs(joined), pairs(filtered));
}

#[test]
fn test_left_outer_join_keeps_unmatched() {
    let mut engine = setup_engine();
    let session = engine.session();
    let rows = session.exec(&select_pair("hero", "team").outer_join("team")).unwrap().all().unwrap();
    assert_eq!(
        pairs(rows),
        vec![
            ("Deadpond".to_string(), Some("Z-Force".to_string())),
            ("Rusty-Man".to_string(), Some("Preventers".to_string())),
            ("Spider-Boy".to_string(), None),
            ("Dummy".to_string(), Some("Z-Force".to_string())),
        ]
    );
}

#[test]
fn test_join_used_only_for_filtering() {
    let mut engine = setup_engine();
    let session = engine.session();
    let statement = select("hero").join("team").where_(col("team", "name").eq("Preventers"));
    let heroes: Vec<String> = session.exec(&statement).unwrap().map(|h| name(&h.unwrap())).collect();
    assert_eq!(heroes, vec!["Rusty-Man"]);
}

#[test]
fn test_outer_join_filter_on_absent_side_is_false() {
    let mut engine = setup_engine();
    let session = engine.session();
    let statement = select_pair("hero", "team")
        .outer_join("team")
        .where_(col("team", "headquarters").ge(""));
    let rows = session.exec(&statement).unwrap().all().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|(_, team)| team.is_some()));
}

#[test]
fn test_explicit_join_condition() {
    let mut engine = setup_engine();
    let session = engine.session();
    let statement = select_pair("team", "hero")
        .outer_join_on("hero", col("team", "id"), col("hero", "team_id"))
        .order_by(col("hero", "name"));
    let rows = session.exec(&statement).unwrap().all().unwrap();
    let names: Vec<(String, Option<String>)> = pairs(rows);
    assert_eq!(
        names,
        vec![
            ("Z-Force".to_string(), Some("Deadpond".to_string())),
            ("Z-Force".to_string(), Some("Dummy".to_string())),
            ("Preventers".to_string(), Some("Rusty-Man".to_string())),
        ]
    );
}

#[test]
fn test_cross_product_without_condition() {
    let mut engine = setup_engine();
    let session = engine.session();
    let rows = session.exec(&select_tuple(&["hero", "team"])).unwrap().all().unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|row| row.len() == 2 && row.iter().all(Option::is_some)));
}

#[test]
fn test_join_order_and_paging() {
    let mut engine = setup_engine();
    let session = engine.session();
    let statement = select_pair("hero", "team")
        .join("team")
        .order_by_desc(col("hero", "age"))
        .offset(1)
        .limit(1);
    let rows = session.exec(&statement).unwrap().all().unwrap();
    // Deadpond has no age and sorts first when descending.
    assert_eq!(pairs(rows), vec![("Rusty-Man".to_string(), Some("Preventers".to_string()))]);
}

#[test]
fn test_join_without_foreign_key_fails() {
    let mut engine = setup_engine();
    engine
        .define(EntityDef::new("villain").field(Field::new("id", DataType::Integer).optional()))
        .unwrap();
    engine.create_all().unwrap();
    let session = engine.session();
    let result = session.exec(&select("hero").join("villain"));
    assert!(matches!(result, Err(DbError::ExecutionError(_))));
}

#[test]
fn test_join_type_mismatch() {
    let mut engine = setup_engine();
    let session = engine.session();
    let result = session.exec(&select_pair("hero", "team").where_(col("hero", "name").eq(col("team", "id"))));
    assert!(matches!(result, Err(DbError::TypeMismatch(_))));
}

#[test]
fn test_null_foreign_keys_never_match() {
    let mut engine = setup_engine();
    let session = engine.session();
    let rows = session.exec(&select_pair("hero", "team").join("team")).unwrap().all().unwrap();
    assert!(rows.iter().all(|(hero, _)| hero.get("team_id") != Some(Value::Null)));
}
