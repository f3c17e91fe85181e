use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, ensure};
use clap::{Parser, Subcommand};
use palate_engine::{Catalog, CatalogProvider as _, GameConfig, RoundEngine, SessionSeed};
use palate_model::Category;

use crate::util::{self, JsonCatalog};

use self::{generate_catalog::GenerateCatalogArg, play::PlayArg, simulate::SimulateArg};

mod generate_catalog;
mod play;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Write a synthetic catalog
    GenerateCatalog(#[clap(flatten)] GenerateCatalogArg),
    /// Play a full duel with a scripted player and print the summary
    Simulate(#[clap(flatten)] SimulateArg),
    /// Play a duel interactively on the terminal
    Play(#[clap(flatten)] PlayArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::GenerateCatalog(arg) => generate_catalog::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::Play(arg) => play::run(&arg)?,
    }
    Ok(())
}

/// Options shared by every command that runs a duel.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GameArgs {
    /// Catalog JSON file
    #[arg(long)]
    catalog: PathBuf,
    /// Category to play; ignored when `--config` is given
    #[arg(long)]
    category: Option<Category>,
    /// Game configuration JSON overriding the built-in profile
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of rounds, overriding the profile
    #[arg(long)]
    rounds: Option<usize>,
    /// Session seed (up to 32 hex digits); random when omitted
    #[arg(long)]
    seed: Option<SessionSeed>,
}

impl GameArgs {
    fn config(&self) -> anyhow::Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_config_file(path)?,
            None => GameConfig::for_category(self.category.unwrap_or_default()),
        };
        if let Some(rounds) = self.rounds {
            ensure!(rounds > 0, "--rounds must be positive");
            config.profile.total_rounds = rounds;
        }
        Ok(config)
    }

    pub(crate) fn seed(&self) -> SessionSeed {
        self.seed.unwrap_or_else(SessionSeed::random)
    }

    pub(crate) fn engine(&self) -> anyhow::Result<RoundEngine> {
        let config = self.config()?;
        let category = config.profile.category;
        let items = JsonCatalog::new(&self.catalog).snapshot(category)?;
        tracing::info!(
            catalog = %self.catalog.display(),
            %category,
            items = items.len(),
            "catalog loaded"
        );
        let catalog = Arc::new(Catalog::new(items));
        RoundEngine::new(catalog, config).context("Invalid game configuration")
    }
}
