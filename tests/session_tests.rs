use rustmemorm::{
    DataType, DbError, Engine, EntityDef, Field, Record, RecordState, Value, col, select,
};

fn setup_engine() -> Engine {
    let mut engine = Engine::memory().unwrap();
    engine
        .define(
            EntityDef::new("team")
                .field(Field::new("id", DataType::Integer).optional())
                .field(Field::new("name", DataType::Text))
                .field(Field::new("headquarters", DataType::Text))
                .index("name")
                .has_many("heroes", "hero", "team_id"),
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
                .foreign_key("team_id", "team")
                .belongs_to("team", "team", "team_id"),
        )
        .unwrap();
    engine.create_all().unwrap();
    engine
}

fn hero(name: &str, secret_name: &str) -> Record {
    Record::new("hero").with("name", name).with("secret_name", secret_name)
}

fn team(name: &str, headquarters: &str) -> Record {
    Record::new("team").with("name", name).with("headquarters", headquarters)
}

fn count(engine: &mut Engine, entity: &str) -> usize {
    engine.session().exec(&select(entity)).unwrap().count()
}

#[test]
fn test_commit_assigns_keys_in_staging_order() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let deadpond = hero("Deadpond", "Dive Wilson");
    let spider_boy = hero("Spider-Boy", "Pedro Parqueador");
    let rusty_man = hero("Rusty-Man", "Tommy Sharp").with("age", 48);
    session.add(&deadpond).unwrap();
    session.add(&spider_boy).unwrap();
    session.add(&rusty_man).unwrap();

    assert_eq!(session.pending_count(), 3);
    assert_eq!(deadpond.id(), None);
    assert!(session.exec(&select("hero")).unwrap().all().unwrap().is_empty());

    session.commit().unwrap();
    assert_eq!(deadpond.id(), Some(1));
    assert_eq!(spider_boy.id(), Some(2));
    assert_eq!(rusty_man.id(), Some(3));
    assert_eq!(spider_boy.state(), RecordState::Persistent);
    // Unset optional fields are filled in from storage.
    assert_eq!(deadpond.get("age"), Some(Value::Null));
}

#[test]
fn test_refresh_reloads_committed_values() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let deadpond = hero("Deadpond", "Dive Wilson");
    session.add(&deadpond).unwrap();
    session.commit().unwrap();

    deadpond.set("name", "Scribbled");
    session.refresh(&deadpond).unwrap();
    assert_eq!(deadpond.get("name"), Some(Value::from("Deadpond")));
    assert_eq!(deadpond.to_string(), "hero(id=1, name='Deadpond', secret_name='Dive Wilson', age=None, team_id=None)");

    let transient = hero("Tarantula", "Natalia Roman-on");
    assert!(matches!(session.refresh(&transient), Err(DbError::DetachedRecord(_))));
}

#[test]
fn test_update_existing_record() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    session.add(&hero("Deadpond", "Dive Wilson")).unwrap();
    session.commit().unwrap();

    let picked = session
        .exec(&select("hero").where_(col("hero", "name").eq("Deadpond")))
        .unwrap()
        .one()
        .unwrap();
    picked.set("name", "Deadpool");
    session.add(&picked).unwrap();
    session.commit().unwrap();

    let renamed = session
        .exec(&select("hero").where_(col("hero", "name").eq("Deadpool")))
        .unwrap()
        .one()
        .unwrap();
    assert_eq!(renamed.id(), Some(1));
    assert!(
        session
            .exec(&select("hero").where_(col("hero", "name").eq("Deadpond")))
            .unwrap()
            .first()
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_delete_record() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let deadpond = hero("Deadpond", "Dive Wilson");
    session.add(&deadpond).unwrap();
    session.commit().unwrap();

    session.delete(&deadpond).unwrap();
    session.commit().unwrap();
    assert_eq!(deadpond.state(), RecordState::Deleted);
    assert!(session.get("hero", 1).unwrap().is_none());
    assert!(matches!(session.refresh(&deadpond), Err(DbError::DetachedRecord(_))));

    // A deleted record cannot be saved back under its old key.
    session.add(&deadpond).unwrap();
    assert!(matches!(session.commit(), Err(DbError::DetachedRecord(_))));
}

#[test]
fn test_failed_commit_rolls_back_everything() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let good = hero("Deadpond", "Dive Wilson");
    let bad = hero("Rusty-Man", "Tommy Sharp").with("team_id", 99);
    session.add(&good).unwrap();
    session.add(&bad).unwrap();

    let err = session.commit().unwrap_err();
    assert!(matches!(err, DbError::Integrity(_)));
    assert_eq!(good.id(), None);
    assert_eq!(bad.id(), None);
    assert_eq!(good.state(), RecordState::Transient);
    assert_eq!(session.pending_count(), 0);
    drop(session);
    assert_eq!(count(&mut engine, "hero"), 0);
}

#[test]
fn test_keys_are_never_reused() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let first = hero("Deadpond", "Dive Wilson");
    session.add(&first).unwrap();
    session.commit().unwrap();
    session.delete(&first).unwrap();
    session.commit().unwrap();

    session.add(&hero("Rusty-Man", "Tommy Sharp").with("team_id", 99)).unwrap();
    assert!(session.commit().is_err());

    let next = hero("Spider-Boy", "Pedro Parqueador");
    session.add(&next).unwrap();
    session.commit().unwrap();
    assert_eq!(next.id(), Some(3));
}

#[test]
fn test_invalid_values_fail_the_commit() {
    let mut engine = setup_engine();
    let mut session = engine.session();

    session.add(&Record::new("hero").with("name", "Nameless")).unwrap();
    assert!(matches!(session.commit(), Err(DbError::ConstraintViolation(_))));

    session.add(&hero("Deadpond", "Dive Wilson").with("age", "old")).unwrap();
    assert!(matches!(session.commit(), Err(DbError::TypeMismatch(_))));

    assert!(matches!(
        session.add(&hero("Deadpond", "Dive Wilson").with("power", 9)),
        Err(DbError::UnknownField(_, _))
    ));
    assert!(matches!(session.add(&Record::new("villain")), Err(DbError::UnknownEntity(_))));
    drop(session);
    assert_eq!(count(&mut engine, "hero"), 0);
}

#[test]
fn test_deleting_referenced_parent_is_rejected() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    session.add(&preventers).unwrap();
    session.commit().unwrap();
    let rusty_man = hero("Rusty-Man", "Tommy Sharp").with("team_id", preventers.id());
    session.add(&rusty_man).unwrap();
    session.commit().unwrap();

    session.delete(&preventers).unwrap();
    assert!(matches!(session.commit(), Err(DbError::Integrity(_))));
    assert_eq!(preventers.state(), RecordState::Persistent);
    assert!(session.get("team", 1).unwrap().is_some());

    // Moving the child off the team in the same batch makes the delete valid.
    rusty_man.set("team_id", Value::Null);
    session.add(&rusty_man).unwrap();
    session.delete(&preventers).unwrap();
    session.commit().unwrap();
    assert!(session.get("team", 1).unwrap().is_none());
    assert_eq!(session.get("hero", 1).unwrap().unwrap().get("team_id"), Some(Value::Null));
}

#[test]
fn test_linked_parent_is_inserted_by_cascade() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let z_force = team("Z-Force", "Sister Margaret's Bar");
    let deadpond = hero("Deadpond", "Dive Wilson");
    let dummy = hero("Dummy", "Dummy");
    deadpond.link("team", &z_force);
    dummy.link("team", &z_force);

    session.add(&deadpond).unwrap();
    session.add(&dummy).unwrap();
    session.commit().unwrap();

    assert_eq!(z_force.id(), Some(1));
    assert_eq!(z_force.state(), RecordState::Persistent);
    assert_eq!(deadpond.get("team_id"), Some(Value::Integer(1)));
    assert_eq!(dummy.get("team_id"), Some(Value::Integer(1)));
    drop(session);
    assert_eq!(count(&mut engine, "team"), 1);
}

#[test]
fn test_link_overrides_foreign_key_value() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    let z_force = team("Z-Force", "Sister Margaret's Bar");
    session.add(&preventers).unwrap();
    session.add(&z_force).unwrap();
    session.commit().unwrap();

    let spider_boy = hero("Spider-Boy", "Pedro Parqueador").with("team_id", z_force.id());
    spider_boy.link("team", &preventers);
    session.add(&spider_boy).unwrap();
    session.commit().unwrap();
    assert_eq!(spider_boy.get("team_id"), Some(Value::Integer(1)));
}

#[test]
fn test_link_errors() {
    let mut engine = setup_engine();
    let mut session = engine.session();

    let preventers = team("Preventers", "Sharp Tower");
    preventers.link("heroes", &hero("Deadpond", "Dive Wilson"));
    session.add(&preventers).unwrap();
    assert!(matches!(session.commit(), Err(DbError::ConstraintViolation(_))));

    let spider_boy = hero("Spider-Boy", "Pedro Parqueador");
    spider_boy.link("team", &hero("Deadpond", "Dive Wilson"));
    session.add(&spider_boy).unwrap();
    assert!(matches!(session.commit(), Err(DbError::TypeMismatch(_))));
}

#[test]
fn test_dropped_session_discards_staged_changes() {
    let mut engine = setup_engine();
    let deadpond = hero("Deadpond", "Dive Wilson");
    {
        let mut session = engine.session();
        session.add(&deadpond).unwrap();
        assert_eq!(deadpond.state(), RecordState::Pending);
    }
    assert_eq!(deadpond.state(), RecordState::Transient);
    assert_eq!(count(&mut engine, "hero"), 0);
}

#[test]
fn test_delete_then_add_keeps_record() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let deadpond = hero("Deadpond", "Dive Wilson");
    session.add(&deadpond).unwrap();
    session.commit().unwrap();

    session.delete(&deadpond).unwrap();
    deadpond.set("age", 30);
    session.add(&deadpond).unwrap();
    assert_eq!(session.pending_count(), 1);
    session.commit().unwrap();
    assert_eq!(session.get("hero", 1).unwrap().unwrap().get("age"), Some(Value::Integer(30)));
}

#[test]
fn test_empty_commit_is_noop() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    session.commit().unwrap();
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn test_generated_key_after_maximum_is_rejected() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower").with("id", i64::MAX);
    session.add(&preventers).unwrap();
    session.commit().unwrap();

    let z_force = team("Z-Force", "Sister Margaret's Bar");
    session.add(&z_force).unwrap();
    assert!(matches!(session.commit(), Err(DbError::ConstraintViolation(_))));
    assert_eq!(z_force.id(), None);
    assert_eq!(z_force.state(), RecordState::Transient);

    let stored = session.get("team", i64::MAX).unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(Value::from("Preventers")));
}

#[test]
fn test_delete_of_vanished_row_marks_deleted() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    session.add(&preventers).unwrap();
    session.commit().unwrap();

    let other_handle = session.get("team", 1).unwrap().unwrap();
    session.delete(&other_handle).unwrap();
    session.commit().unwrap();

    session.delete(&preventers).unwrap();
    session.commit().unwrap();
    assert_eq!(preventers.state(), RecordState::Deleted);
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn test_refresh_discards_uncommitted_link() {
    let mut engine = setup_engine();
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    let z_force = team("Z-Force", "Sister Margaret's Bar");
    session.add(&preventers).unwrap();
    session.add(&z_force).unwrap();
    session.commit().unwrap();

    let rusty_man = hero("Rusty-Man", "Tommy Sharp").with("team_id", preventers.id());
    session.add(&rusty_man).unwrap();
    session.commit().unwrap();

    rusty_man.link("team", &z_force);
    session.refresh(&rusty_man).unwrap();
    rusty_man.set("age", 48);
    session.add(&rusty_man).unwrap();
    session.commit().unwrap();

    let stored = session.get("hero", 1).unwrap().unwrap();
    assert_eq!(stored.get("team_id"), preventers.get("id"));
    assert_eq!(stored.get("age"), Some(Value::Integer(48)));
}
