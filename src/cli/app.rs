use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use super::scenarios;

/// Hero and team walkthroughs for the RustMemORM store
#[derive(Parser, Debug)]
#[command(name = "rustmemorm", version, about = "Hero and team walkthroughs for the RustMemORM store")]
pub struct Args {
    /// Directory holding the database files
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Log every storage operation and query
    #[arg(long)]
    pub echo: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Create, filter, page, update and delete heroes (database.db)
    Heroes,
    /// Heroes with teams: implicit, inner and outer joins (database_rel.db)
    Joins,
    /// Teams and heroes linked through relationships (database_rel2.db)
    Relationships,
    /// Every walkthrough in order
    All,
}

pub struct App {
    args: Args,
}

impl App {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub fn run(&self) -> Result<()> {
        let command = self.args.command.unwrap_or(Command::All);
        let dir = &self.args.data_dir;
        std::fs::create_dir_all(dir)?;
        info!(?command, data_dir = %dir.display(), "running");

        match command {
            Command::Heroes => scenarios::heroes(dir, self.args.echo),
            Command::Joins => scenarios::joins(dir, self.args.echo),
            Command::Relationships => scenarios::relationships(dir, self.args.echo),
            Command::All => {
                scenarios::heroes(dir, self.args.echo)?;
                scenarios::joins(dir, self.args.echo)?;
                scenarios::relationships(dir, self.args.echo)
            }
        }
    }
}
