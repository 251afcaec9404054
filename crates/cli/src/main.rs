//! LearnLoop CLI: the main entry point.
//!
//! Commands:
//! - `onboard` : Write the default config
//! - `chat`    : Interactive or single-message tutoring
//! - `gateway` : Start the HTTP API server
//! - `profile` : Show a student's learning profile

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "learnloop",
    about = "LearnLoop — adaptive AI tutor backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Chat with the tutor
    Chat {
        /// Student id the session belongs to
        #[arg(short, long, default_value = "local_student", env = "LEARNLOOP_STUDENT")]
        student: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Never run web search
        #[arg(long)]
        no_search: bool,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show a student's profile and recommendations
    Profile {
        /// Student id
        student: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            student,
            message,
            no_search,
        } => commands::chat::run(student, message, !no_search).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Profile { student } => commands::profile::run(student).await?,
    }

    Ok(())
}
