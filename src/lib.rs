pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{AnalysisQuery, Analyzer};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// List the series catalog, optionally filtered by a search term.
    Catalog { search: Option<String> },
    Query { query: AnalysisQuery, json: bool },
    Export {
        query: AnalysisQuery,
        output: PathBuf,
        stats: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tslab starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = Arc::new(providers::SgsProvider::from_config(&config.providers.sgs));
    let analyzer = Analyzer::from_config(&config, provider);

    match command {
        AppCommand::Catalog { search } => {
            cli::catalog::run(search.as_deref());
            Ok(())
        }
        AppCommand::Query { query, json } => cli::query::run(&analyzer, &query, json).await,
        AppCommand::Export {
            query,
            output,
            stats,
        } => cli::export::run(&analyzer, &query, &config.export, &output, stats).await,
    }
}
