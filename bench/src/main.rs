use clap::Parser;
use std::panic;
use tracing::{error, info};

use fga_bench::{load_config, logging::init_logging, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Set up panic handler after logging so it can use it
    panic::set_hook(Box::new(|panic_info| {
        error!(?panic_info, "FATAL: Panic occurred");
        std::process::exit(1);
    }));

    info!(workload = ?cli.workload, iterations = cli.iterations, concurrency = cli.concurrency, "fga-bench starting");

    match run(&cli, config).await {
        Ok(summaries) => {
            for summary in &summaries {
                info!(
                    workload = summary.workload,
                    iterations = summary.iterations,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    throughput = summary.throughput,
                    "Summary"
                );
            }
        }
        Err(err) => {
            error!(kind = ?err.kind(), error = %err, "Benchmark run failed");
            std::process::exit(err.exit_code());
        }
    }
}
