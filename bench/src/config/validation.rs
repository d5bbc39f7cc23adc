use anyhow::{anyhow, Result};
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use garde::Validate;

use super::BenchConfig;
use crate::workload::WorkloadSelection;

#[derive(Parser, Clone, Debug)]
#[command(name = "fga-bench", about = "Relationship workload benchmarks for OpenFGA")]
pub struct Cli {
    /// Path to an extra configuration file
    #[arg(long, env = "FGA_BENCH_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Environment name, selects config/<name>.toml
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Workload to run. The bundled model has no inherited relations, so
    /// `transitive` checks are denied by a live OpenFGA; use --in-memory for it
    #[arg(long, value_enum, default_value_t = WorkloadSelection::All)]
    pub workload: WorkloadSelection,

    /// Invocations per workload
    #[arg(long, default_value_t = 1_000)]
    pub iterations: usize,

    /// Concurrent workers per workload
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Run against the in-memory service instead of OpenFGA
    #[arg(long)]
    pub in_memory: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            environment: None,
            workload: WorkloadSelection::All,
            iterations: 1_000,
            concurrency: 4,
            in_memory: false,
            debug: false,
        }
    }
}

/// Build the layered figment for `cli`
///
/// Precedence, lowest first: embedded defaults, `config/default.toml`,
/// `config/<environment>.toml`, `--config` file, `FGA_BENCH_*` variables,
/// `OPENFGA_API_URL` / `OPENFGA_API_TOKEN`, CLI flags.
pub fn figment(cli: &Cli) -> Figment {
    let env_name = cli.environment.clone().unwrap_or_else(||
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
    );

    let mut figment = Figment::new()
        .merge(Serialized::defaults(BenchConfig::default()))
        .merge(Toml::file("config/default.toml"))
        .merge(Toml::file(format!("config/{}.toml", env_name)));

    if let Some(path) = &cli.config {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment
        .merge(Env::prefixed("FGA_BENCH_").split("__"))
        .merge(
            Env::prefixed("OPENFGA_")
                .only(&["api_url", "api_token"])
                .map(|key| format!("openfga.{}", key).into()),
        );

    if cli.debug {
        figment = figment.merge(Serialized::default("logging.level", "debug"));
    }

    figment
}

/// Load and validate configuration
pub fn load_config(cli: &Cli) -> Result<BenchConfig> {
    let config: BenchConfig = figment(cli).extract()?;

    // Validate with Garde
    config.validate()?;
    config.check_consistency().map_err(|e| anyhow!(e))?;

    Ok(config)
}
