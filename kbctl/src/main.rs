use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "kbctl", version, about = "Operator tooling for the kustomize builder")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the example kustomizations
    Samples {
        #[command(subcommand)]
        cmd: SamplesCommands,
    },
    /// Check that the kustomize binary is installed and runnable
    Check(commands::check::CheckArgs),
    /// Exercise /validate and /generate on a running server
    Smoke(commands::smoke::SmokeArgs),
    /// Print version and exit
    Version,
}

#[derive(Subcommand)]
enum SamplesCommands {
    /// List available samples
    List(commands::samples::ListArgs),
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Samples { cmd } => match cmd {
            SamplesCommands::List(args) => commands::samples::list(args)?,
        },
        Commands::Check(args) => commands::check::run(args).await?,
        Commands::Smoke(args) => commands::smoke::run(args).await?,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
