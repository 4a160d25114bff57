//! agentmarket entry point

use agentmarket::agent::{AgentRegistry, Reasoner};
use agentmarket::api::{self, ApiContext};
use agentmarket::config::PlatformConfig;
use agentmarket::events::EventQueue;
use agentmarket::llm::provider::LlmProvider;
use agentmarket::llm::providers::{AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider};
use agentmarket::market::MarketRegistry;
use agentmarket::observability::logging::init_default_logging;
use agentmarket::pipeline::Orchestrator;
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Agent-driven prediction market pipeline
#[derive(Parser)]
#[command(name = "agentmarket")]
#[command(about = "Agent-driven prediction market pipeline")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the platform: bootstrap the roster and serve the HTTP API
    Run,
    /// Run pipeline cycles once and print the reports
    Cycle {
        /// Number of full cycles to run
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Validate configuration
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_platform(config).await,
        Commands::Cycle { count } => run_cycles(config, count).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {e}");
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<PlatformConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(PlatformConfig::load_from_file(path)?);
    }

    for path_str in ["agentmarket.toml", "config/agentmarket.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(PlatformConfig::load_from_file(&path)?);
        }
    }

    info!("No configuration file found, using built-in defaults");
    Ok(PlatformConfig::default_config())
}

fn build_reasoner(config: &PlatformConfig) -> Result<Reasoner, Box<dyn std::error::Error>> {
    let provider: Arc<dyn LlmProvider> = match config.llm.provider.as_str() {
        "synthetic" => {
            info!("Running without a remote reasoning provider");
            return Ok(Reasoner::synthetic());
        }
        "openai" => {
            let mut openai_config = OpenAiConfig {
                api_key: config.get_llm_api_key()?,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                openai_config.base_url = base_url.clone();
            }
            openai_config.timeout = Duration::from_secs(config.llm.timeout_secs);
            Arc::new(OpenAiProvider::new(openai_config)?)
        }
        "anthropic" => {
            let mut anthropic_config = AnthropicConfig {
                api_key: config.get_llm_api_key()?,
                ..Default::default()
            };
            if let Some(base_url) = &config.llm.base_url {
                anthropic_config.base_url = base_url.clone();
            }
            anthropic_config.timeout = Duration::from_secs(config.llm.timeout_secs);
            Arc::new(AnthropicProvider::new(anthropic_config)?)
        }
        provider => return Err(format!("Unsupported reasoning provider: {provider}").into()),
    };

    Ok(Reasoner::new(
        provider,
        config.llm.model.clone(),
        config.llm.temperature.unwrap_or(0.7),
        config.llm.max_tokens.unwrap_or(1024),
    ))
}

fn bootstrap(config: &PlatformConfig) -> Result<(Arc<Orchestrator>, Arc<Reasoner>), Box<dyn std::error::Error>> {
    let reasoner = Arc::new(build_reasoner(config)?);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(AgentRegistry::new()),
        Arc::new(MarketRegistry::new()),
        Arc::new(EventQueue::new()),
    ));

    for spec in &config.agents {
        let id = orchestrator.agents().create(spec, reasoner.clone())?;
        info!(id = %id, name = %spec.name, "Roster agent created");
    }
    info!(agents = orchestrator.agents().total(), "Bootstrap complete");

    Ok((orchestrator, reasoner))
}

async fn run_platform(config: PlatformConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Starting {} v{}",
        config.platform.name,
        env!("CARGO_PKG_VERSION")
    );

    let (orchestrator, reasoner) = bootstrap(&config)?;

    if let Some(interval) = config.pipeline.cycle_interval_secs {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval));
            loop {
                ticker.tick().await;
                let report = orchestrator.run_full_cycle().await;
                if report.total_failures() > 0 {
                    warn!(
                        cycle = report.cycle,
                        failures = report.total_failures(),
                        "Scheduled cycle finished with failures"
                    );
                }
            }
        });
        info!(interval_secs = interval, "Scheduled cycle loop started");
    }

    let host: IpAddr = config.server.host.parse()?;
    let ctx = ApiContext {
        orchestrator,
        reasoner,
        platform_name: config.platform.name.clone(),
    };
    let server = tokio::spawn(api::serve(ctx, host, config.server.port));

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = server => error!("HTTP server stopped unexpectedly"),
    }

    Ok(())
}

async fn run_cycles(config: PlatformConfig, count: u32) -> Result<(), Box<dyn std::error::Error>> {
    let (orchestrator, _reasoner) = bootstrap(&config)?;

    for _ in 0..count {
        let report = orchestrator.run_full_cycle().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let status = orchestrator.system_status();
    info!(
        cycles = status.cycles_completed,
        markets = status.market_count,
        events = status.event_queue_depth,
        "Cycle run finished"
    );
    Ok(())
}

fn handle_config_command(
    config: PlatformConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        println!(
            "Configuration valid: {} agents in roster, provider {}",
            config.agents.len(),
            config.llm.provider
        );
    }
    Ok(())
}
