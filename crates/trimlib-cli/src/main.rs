//! trimlib CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::EngineArgs;

#[derive(Parser)]
#[command(name = "trimlib")]
#[command(version)]
#[command(about = "Expand namespaced template tags in markup documents", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand every tag in a document
    Expand {
        /// Input document ('-' for stdin)
        input: String,

        /// Write output to FILE (defaults to stdout)
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Render a single template
    Render {
        /// Namespace of the library
        namespace: String,

        /// Template name
        template: String,

        /// Template data as a JSON object
        #[arg(short = 'd', long)]
        data: Option<String>,

        /// Document whose library declarations should be used
        #[arg(short = 'i', long)]
        input: Option<String>,
    },

    /// Load every declared library and compile all of its templates
    Check {
        /// Document whose library declarations should be checked
        input: Option<String>,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trimlib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Expand { input, output } => commands::expand::execute(
            &cli.engine,
            commands::expand::ExpandArgs { input, output },
        ),
        Commands::Render {
            namespace,
            template,
            data,
            input,
        } => commands::render::execute(
            &cli.engine,
            commands::render::RenderArgs {
                namespace,
                template,
                data,
                input,
            },
        ),
        Commands::Check { input, json } => {
            commands::check::execute(&cli.engine, commands::check::CheckArgs { input, json })
        }
    }
}
