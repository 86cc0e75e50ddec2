use clap::{Parser, Subcommand, ValueEnum};
use sltm_loading::{LoadingOutcome, NetworkLoading, SolutionScheme, TampereNodeModel};
use sltm_scenario::CompiledScenario;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Scenario(#[from] sltm_scenario::ScenarioError),

    #[error(transparent)]
    Loading(#[from] sltm_loading::LoadingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sltm")]
#[command(about = "Static network loading with point-queue capacity constraints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario file syntax and structure
    Validate {
        /// Path to the scenario file (YAML, or JSON by extension)
        scenario_path: PathBuf,
    },
    /// Summarise the network and route choice of a scenario
    Info {
        /// Path to the scenario file
        scenario_path: PathBuf,
    },
    /// Run a network loading and print link flows
    Run {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Override the initial solution scheme
        #[arg(long, value_enum)]
        scheme: Option<SchemeArg>,
        /// Per-iteration and per-node debug logging
        #[arg(long)]
        detailed: bool,
        /// Never switch to a stricter scheme
        #[arg(long)]
        no_escalation: bool,
        /// Write results to a file (.json or .yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    PointQueueBasic,
    PointQueueAdvanced,
    PhysicalQueueBasic,
}

impl From<SchemeArg> for SolutionScheme {
    fn from(value: SchemeArg) -> Self {
        match value {
            SchemeArg::PointQueueBasic => SolutionScheme::PointQueueBasic,
            SchemeArg::PointQueueAdvanced => SolutionScheme::PointQueueAdvanced,
            SchemeArg::PhysicalQueueBasic => SolutionScheme::PhysicalQueueBasic,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Info { scenario_path } => cmd_info(&scenario_path),
        Commands::Run {
            scenario_path,
            scheme,
            detailed,
            no_escalation,
            output,
        } => cmd_run(
            &scenario_path,
            scheme.map(SolutionScheme::from),
            detailed,
            no_escalation,
            output.as_deref(),
        ),
    }
}

fn load(scenario_path: &Path) -> CliResult<CompiledScenario> {
    let scenario = sltm_scenario::load(scenario_path)?;
    Ok(sltm_scenario::compile(&scenario)?)
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let compiled = load(scenario_path)?;
    let loading = NetworkLoading::new(
        compiled.network,
        compiled.flow_update,
        TampereNodeModel,
        compiled.settings,
    );
    loading.validate()?;
    println!("✓ Scenario is valid");
    Ok(())
}

fn cmd_info(scenario_path: &Path) -> CliResult<()> {
    let compiled = load(scenario_path)?;
    let network = &compiled.network;
    println!("Scenario: {}", compiled.name);
    println!(
        "  {} nodes ({} centroids), {} link segments",
        network.node_count(),
        network.centroids().count(),
        network.link_segment_count()
    );
    match &compiled.flow_update {
        sltm_loading::FlowUpdateStrategy::Paths(p) => {
            let demand: f64 = p.paths().iter().map(|p| p.flow_pcu_h).sum();
            println!("  {} paths, {:.1} pcu/h", p.paths().len(), demand);
        }
        sltm_loading::FlowUpdateStrategy::Bushes(b) => {
            let demand: f64 = b.bushes().iter().map(|b| b.demand_pcu_h()).sum();
            println!("  {} origin bushes, {:.1} pcu/h", b.bushes().len(), demand);
        }
    }
    println!("  Initial scheme: {}", compiled.settings.initial_scheme);
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    scheme: Option<SolutionScheme>,
    detailed: bool,
    no_escalation: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let compiled = load(scenario_path)?;
    let mut settings = compiled.settings.clone();
    if let Some(scheme) = scheme {
        settings.initial_scheme = scheme;
    }
    settings.detailed_logging |= detailed;
    settings.disable_escalation |= no_escalation;

    println!("Running network loading for scenario: {}", compiled.name);
    let mut loading = NetworkLoading::new(
        compiled.network.clone(),
        compiled.flow_update.clone(),
        TampereNodeModel,
        settings,
    );
    let outcome = loading.run()?;

    if outcome.converged {
        println!(
            "✓ Converged in {} iterations (gap {:.3e}, {})",
            outcome.iterations, outcome.final_gap, outcome.scheme
        );
    } else {
        println!(
            "✗ Not converged after {} iterations (gap {:.3e}, {})",
            outcome.iterations, outcome.final_gap, outcome.scheme
        );
    }
    print_flows(&compiled, &outcome);

    if let Some(path) = output {
        write_results(path, &outcome)?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}

fn print_flows(compiled: &CompiledScenario, outcome: &LoadingOutcome) {
    let r = &outcome.results;
    println!(
        "  {:<16} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "segment", "capacity", "inflow", "sending", "outflow", "alpha"
    );
    for segment in compiled.network.link_segments() {
        let id = segment.id;
        println!(
            "  {:<16} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>8.4}",
            segment.name,
            segment.capacity_pcu_h,
            r.inflow(id),
            r.sending(id),
            r.outflow(id),
            r.flow_acceptance(id)
        );
    }
}

fn write_results(path: &Path, outcome: &LoadingOutcome) -> CliResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(outcome)?,
        _ => serde_yaml::to_string(outcome)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}
