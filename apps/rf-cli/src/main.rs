use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rf_blueprint::Blueprint;
use rf_components::interfaces::DIMENSIONALITY;
use rf_components::{ComponentCatalog, InterfaceKind};
use rf_network::{NetworkBuilder, NetworkError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Blueprint error: {0}")]
    Blueprint(#[from] rf_blueprint::BlueprintError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "RegFlow CLI - blueprint-driven registration pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and wire a blueprint, reporting what each vertex became
    Check {
        /// Path to the blueprint file (JSON or YAML)
        blueprint_path: PathBuf,
    },
    /// Render a blueprint as graphviz dot
    Graph {
        /// Path to the blueprint file (JSON or YAML)
        blueprint_path: PathBuf,
        /// Output dot file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the component classes the catalog can instantiate
    Components,
}

fn main() -> CliResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { blueprint_path } => cmd_check(&blueprint_path),
        Commands::Graph {
            blueprint_path,
            output,
        } => cmd_graph(&blueprint_path, output.as_deref()),
        Commands::Components => cmd_components(),
    }
}

fn cmd_check(blueprint_path: &Path) -> CliResult<()> {
    println!("Checking blueprint: {}", blueprint_path.display());
    let blueprint = Blueprint::from_file(blueprint_path)?;
    println!(
        "  {} components, {} connections",
        blueprint.component_count(),
        blueprint.connection_count()
    );

    let mut builder = NetworkBuilder::new(blueprint, ComponentCatalog::with_defaults());
    match builder.configure() {
        Ok(()) => {}
        Err(NetworkError::UnresolvedComponents {
            ambiguous,
            exhausted,
        }) => {
            for (name, count) in &ambiguous {
                println!("✗ {}: {} candidates remain", name, count);
            }
            for name in &exhausted {
                println!("✗ {}: no candidate satisfies the criteria", name);
            }
            return Err(NetworkError::UnresolvedComponents {
                ambiguous,
                exhausted,
            }
            .into());
        }
        Err(err) => return Err(err.into()),
    }
    for (name, class) in builder.resolutions() {
        println!("  {} -> {}", name, class);
    }

    builder.connect_components()?;
    let network = builder.realize()?;
    println!("✓ Blueprint realized");
    println!(
        "  Execution order: {}",
        network.execution_order().join(" -> ")
    );
    Ok(())
}

fn cmd_graph(blueprint_path: &Path, output: Option<&Path>) -> CliResult<()> {
    let blueprint = Blueprint::from_file(blueprint_path)?;
    match output {
        Some(path) => {
            blueprint.write_dot(path)?;
            println!("✓ Wrote {}", path.display());
        }
        None => print!("{}", blueprint.to_dot()),
    }
    Ok(())
}

fn cmd_components() -> CliResult<()> {
    let catalog = ComponentCatalog::with_defaults();
    println!("Component catalog ({} classes):", catalog.len());
    for entry in catalog.entries() {
        let dimensionality = entry
            .template_properties()
            .single(DIMENSIONALITY)
            .map(|d| format!(" {}-D", d))
            .unwrap_or_default();
        println!(
            "  {}{} (accepts: {}; provides: {})",
            entry.class_name(),
            dimensionality,
            interface_list(entry.accepts()),
            interface_list(entry.provides())
        );
    }
    Ok(())
}

fn interface_list(kinds: &[InterfaceKind]) -> String {
    if kinds.is_empty() {
        return "-".to_string();
    }
    kinds
        .iter()
        .map(|kind| kind.name())
        .collect::<Vec<_>>()
        .join(", ")
}
