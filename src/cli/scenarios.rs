//! The walkthroughs. Each opens its own file from scratch and prints what
//! it reads back.

use std::path::Path;

use anyhow::{Context, Result};
use rustmemorm::{
    DbError, Engine, EngineConfig, Record, Session, Value, col, or_, select, select_pair,
};

use super::models::{self, HERO, TEAM};

fn open(data_dir: &Path, file: &str, echo: bool) -> Result<Engine> {
    let config = EngineConfig::new(data_dir.join(file)).fresh(true).echo(echo);
    Engine::open(config).with_context(|| format!("cannot open {}", file))
}

fn heading(title: &str) {
    println!();
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!();
}

fn text(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(Value::Text(s)) => s,
        Some(other) => other.to_string(),
        None => "None".to_string(),
    }
}

fn show(record: Option<&Record>) -> String {
    record.map_or_else(|| "None".to_string(), Record::to_string)
}

fn hero(name: &str, secret_name: &str, age: Option<i64>) -> Record {
    Record::new(HERO)
        .with("name", name)
        .with("secret_name", secret_name)
        .with("age", age)
}

fn team(name: &str, headquarters: &str) -> Record {
    Record::new(TEAM).with("name", name).with("headquarters", headquarters)
}

fn print_heroes(session: &Session<'_>, statement: &rustmemorm::Select<Record>) -> Result<()> {
    for hero in session.exec(statement)? {
        println!("Hero: {}", hero?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// heroes: database.db
// ---------------------------------------------------------------------------

pub fn heroes(data_dir: &Path, echo: bool) -> Result<()> {
    let mut engine = open(data_dir, "database.db", echo)?;

    heading("Create DB and tables");
    engine.define(models::hero())?;
    engine.create_all()?;

    heading("Create Heroes");
    create_heroes(&mut engine)?;

    heading("Select Heroes");
    select_heroes(&mut engine)?;

    heading("Add more Heroes");
    add_more_heroes(&mut engine)?;

    heading("Filter Heroes");
    filter_heroes(&mut engine)?;

    heading("More filtering");
    more_filtering(&mut engine)?;

    heading("Using limit");
    using_limit(&mut engine)?;

    heading("Update Hero");
    update_hero(&mut engine)?;

    heading("Delete Hero");
    delete_hero(&mut engine)?;
    println!();
    Ok(())
}

fn create_heroes(engine: &mut Engine) -> Result<()> {
    let hero_1 = hero("Deadpond", "Dive Wilson", None);
    let hero_2 = hero("Spider-Boy", "Pedro Parqueador", None);
    let hero_3 = hero("Rusty-Man", "Tommy Sharp", Some(48));

    let mut session = engine.session();
    session.add(&hero_1)?;
    session.add(&hero_2)?;
    session.add(&hero_3)?;
    session.commit()?;

    println!("Hero 1 name: {}", text(&hero_1, "name"));
    println!();
    println!("Hero 2 name: {}", text(&hero_2, "name"));
    println!();
    session.refresh(&hero_1)?;
    println!("Hero 1: {}", hero_1);
    Ok(())
}

fn select_heroes(engine: &mut Engine) -> Result<()> {
    let session = engine.session();
    let statement = select(HERO);
    print_heroes(&session, &statement)?;

    let heroes = session.exec(&statement)?.all()?;
    println!("Heroes as a list: {}", heroes.len());
    Ok(())
}

fn add_more_heroes(engine: &mut Engine) -> Result<()> {
    let hero_4 = hero("Tarantula", "Natalia Roman-on", Some(32));
    let hero_5 = hero("Black Lion", "Trevor Challa", Some(35));
    let hero_6 = hero("Dr. Weird", "Steve Weird", Some(36));
    let hero_7 = hero("Captain North America", "Esteban Rogelios", Some(93));

    let mut session = engine.session();
    for hero in [&hero_4, &hero_5, &hero_6, &hero_7] {
        session.add(hero)?;
    }
    session.commit()?;

    session.refresh(&hero_4)?;
    println!("Hero 4: {}", hero_4);
    Ok(())
}

fn filter_heroes(engine: &mut Engine) -> Result<()> {
    let session = engine.session();
    let age = col(HERO, "age");

    print_heroes(&session, &select(HERO).where_(col(HERO, "name").eq("Deadpond")))?;

    // AND
    print_heroes(&session, &select(HERO).where_(age.gt(30)).where_(age.lt(40)))?;

    // OR
    print_heroes(&session, &select(HERO).where_(or_([age.le(30), age.ge(40)])))?;
    Ok(())
}

fn more_filtering(engine: &mut Engine) -> Result<()> {
    let session = engine.session();

    let picked = session.exec(&select(HERO).where_(col(HERO, "name").eq("Deadpond")))?.first()?;
    println!("Hero: {}", show(picked.as_ref()));

    match session.exec(&select(HERO).where_(or_([col(HERO, "age").gt(30)])))?.one() {
        Ok(hero) => println!("Hero: {}", hero),
        Err(e @ DbError::MultipleResultsFound) => println!("Error because more than one {}", e),
        Err(e) => return Err(e.into()),
    }

    match session.exec(&select(HERO).where_(col(HERO, "name").eq("Ironman")))?.one() {
        Ok(hero) => println!("Hero: {}", hero),
        Err(e @ DbError::NoResultFound) => println!("Error because no row {}", e),
        Err(e) => return Err(e.into()),
    }

    let hero = session.get(HERO, 1)?;
    println!("Hero: {}", show(hero.as_ref()));
    Ok(())
}

fn using_limit(engine: &mut Engine) -> Result<()> {
    let session = engine.session();
    print_heroes(&session, &select(HERO).limit(2))?;
    println!("the next 2");
    print_heroes(&session, &select(HERO).offset(2).limit(2))?;
    Ok(())
}

fn update_hero(engine: &mut Engine) -> Result<()> {
    let mut session = engine.session();
    let picked = session.exec(&select(HERO).where_(col(HERO, "name").eq("Deadpond")))?.one()?;
    picked.set("name", "Deadpool");
    session.add(&picked)?;
    session.commit()?;

    let picked = session.exec(&select(HERO).where_(col(HERO, "name").eq("Deadpool")))?.first()?;
    println!("Hero: {}", show(picked.as_ref()));
    Ok(())
}

fn delete_hero(engine: &mut Engine) -> Result<()> {
    let mut session = engine.session();
    let picked = session.exec(&select(HERO).where_(col(HERO, "name").eq("Deadpool")))?.one()?;
    session.delete(&picked)?;
    session.commit()?;

    let picked = session.exec(&select(HERO).where_(col(HERO, "name").eq("Deadpool")))?.first()?;
    println!("Hero: {}", show(picked.as_ref()));
    Ok(())
}

// ---------------------------------------------------------------------------
// joins: database_rel.db
// ---------------------------------------------------------------------------

pub fn joins(data_dir: &Path, echo: bool) -> Result<()> {
    let mut engine = open(data_dir, "database_rel.db", echo)?;

    heading("Create DB and tables");
    engine.define(models::team())?;
    engine.define(models::hero_on_team())?;
    engine.create_all()?;

    heading("Create Heroes");
    create_heroes_with_teams(&mut engine)?;

    heading("Do Joins");
    do_joins(&mut engine)?;
    Ok(())
}

fn create_heroes_with_teams(engine: &mut Engine) -> Result<()> {
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    let z_force = team("Z-Force", "Sister Margaret's Bar");
    session.add(&preventers)?;
    session.add(&z_force)?;
    session.commit()?;

    let deadpond = hero("Deadpond", "Dive Wilson", None).with("team_id", z_force.id());
    let rusty_man = hero("Rusty-Man", "Tommy Sharp", Some(48)).with("team_id", preventers.id());
    let spider_boy = hero("Spider-Boy", "Pedro Parqueador", None);
    let dummy = hero("Dummy", "Dummy", Some(1)).with("team_id", z_force.id());
    for hero in [&deadpond, &rusty_man, &spider_boy, &dummy] {
        session.add(hero)?;
    }
    session.commit()?;

    for hero in [&deadpond, &rusty_man, &spider_boy] {
        session.refresh(hero)?;
        println!("Created hero: {}", hero);
    }
    Ok(())
}

fn do_joins(engine: &mut Engine) -> Result<()> {
    let session = engine.session();

    // Join expressed as a filter over both entities
    let statement = select_pair(HERO, TEAM).where_(col(HERO, "team_id").eq(col(TEAM, "id")));
    for row in session.exec(&statement)? {
        let (hero, team) = row?;
        println!("Hero: {} Team: {}", hero, show(team.as_ref()));
    }

    // Join on the declared foreign key
    for row in session.exec(&select_pair(HERO, TEAM).join(TEAM))? {
        let (hero, team) = row?;
        println!("Hero: {} Team: {}", hero, show(team.as_ref()));
    }

    // Left outer join keeps heroes without a team
    for row in session.exec(&select_pair(HERO, TEAM).outer_join(TEAM))? {
        let (hero, team) = row?;
        println!("Hero: {} Team: {}", hero, show(team.as_ref()));
    }

    // Join used only to filter on the team
    print_heroes(&session, &select(HERO).join(TEAM).where_(col(TEAM, "name").eq("Preventers")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// relationships: database_rel2.db
// ---------------------------------------------------------------------------

pub fn relationships(data_dir: &Path, echo: bool) -> Result<()> {
    let mut engine = open(data_dir, "database_rel2.db", echo)?;

    heading("Create DB and tables");
    let (team_def, hero_def) = models::related();
    engine.define(team_def)?;
    engine.define(hero_def)?;
    engine.create_all()?;

    heading("Create Heroes");
    create_linked_heroes(&mut engine)?;

    heading("Add Hero to Team");
    add_hero_to_team(&mut engine)?;
    Ok(())
}

fn create_linked_heroes(engine: &mut Engine) -> Result<()> {
    let mut session = engine.session();
    let preventers = team("Preventers", "Sharp Tower");
    let z_force = team("Z-Force", "Sister Margaret's Bar");

    let deadpond = hero("Deadpond", "Dive Wilson", None);
    deadpond.link("team", &z_force);
    let rusty_man = hero("Rusty-Man", "Tommy Sharp", Some(48));
    rusty_man.link("team", &preventers);
    let spider_boy = hero("Spider-Boy", "Pedro Parqueador", None);
    let dummy = hero("Dummy", "Dummy", Some(1));
    dummy.link("team", &z_force);

    // Teams are inserted by cascade.
    for hero in [&deadpond, &rusty_man, &spider_boy, &dummy] {
        session.add(hero)?;
    }
    session.commit()?;

    for hero in [&deadpond, &rusty_man, &spider_boy] {
        session.refresh(hero)?;
        println!("Created hero: {}", hero);
    }
    Ok(())
}

fn add_hero_to_team(engine: &mut Engine) -> Result<()> {
    let mut session = engine.session();
    let preventers = session.exec(&select(TEAM).where_(col(TEAM, "name").eq("Preventers")))?.one()?;
    let hero = session.exec(&select(HERO).where_(col(HERO, "name").eq("Spider-Boy")))?.one()?;

    hero.link("team", &preventers);
    session.add(&hero)?;
    session.commit()?;

    session.refresh(&preventers)?;
    let heroes: Vec<String> = session
        .related_many(&preventers, "heroes")?
        .iter()
        .map(Record::to_string)
        .collect();
    println!("Team Preventers: [{}]", heroes.join(", "));
    Ok(())
}
