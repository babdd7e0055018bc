//! services/client/src/bin/doc2video.rs

use clap::{Parser, Subcommand};
use client_lib::{
    app::{build_service, machine_settings, poll_settings, render_dashboard, watch},
    config::Config,
    error::ClientError,
    files::load_document,
};
use playlist_core::{
    dashboard::Dashboard,
    domain::{Phase, Plan},
    machine::UploadMachine,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "doc2video", about = "Turn documents into video playlists")]
struct Cli {
    /// Answer from built-in fixtures instead of the backend.
    #[arg(long, global = true)]
    mock: bool,

    /// Backend base URL (overrides API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a document and follow it until its playlist is ready.
    Upload {
        path: PathBuf,
        /// Wait for the first video instead of completing on acknowledgement.
        #[arg(long)]
        staged: bool,
        /// Stop after this many dashboard updates.
        #[arg(long)]
        polls: Option<u32>,
    },
    /// Print a document's outline once.
    Status { document_id: String },
    /// Follow a document's dashboard.
    Watch {
        document_id: String,
        #[arg(long)]
        polls: Option<u32>,
    },
    /// Request the video for one topic.
    Generate { document_id: String, topic_id: String },
    /// Show the current subscription.
    Subscription,
    /// Upgrade to premium.
    Subscribe {
        #[arg(value_parser = parse_plan)]
        plan: Plan,
    },
}

fn parse_plan(raw: &str) -> Result<Plan, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if cli.mock {
        config.mock_mode = true;
    }
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Initialize the Service Adapter ---
    let api = build_service(&config)?;

    // --- 3. Run the Command ---
    match cli.command {
        Command::Upload {
            path,
            staged,
            polls,
        } => {
            let file = load_document(&path).await?;
            let machine = UploadMachine::new(api, machine_settings(&config, staged));
            let receipt = machine.select_file(file).await?;
            println!("Uploaded. Document id: {}", receipt.document_id);

            if machine.run_to_completion().await? == Phase::Error {
                let state = machine.snapshot().await;
                warn!("Job ended in error");
                println!("{}", state.error.unwrap_or_default());
                return Ok(());
            }
            let dashboard = machine.dashboard(poll_settings(&config)).await?;
            watch(&dashboard, polls).await?;
        }
        Command::Status { document_id } => {
            let dashboard = Dashboard::new(api, document_id, poll_settings(&config));
            dashboard.refresh().await?;
            let state = dashboard.snapshot().await;
            let views = dashboard.topic_views().await;
            println!("{}", render_dashboard(dashboard.document_id(), &state, &views));
        }
        Command::Watch { document_id, polls } => {
            let dashboard = Dashboard::new(api, document_id, poll_settings(&config));
            watch(&dashboard, polls).await?;
        }
        Command::Generate {
            document_id,
            topic_id,
        } => {
            let dashboard = Dashboard::new(api, document_id, poll_settings(&config));
            dashboard.refresh().await?;
            let ticket = dashboard.request_video(&topic_id).await?;
            println!("Video {} requested; it will appear in the dashboard once ready.", ticket.video_id);
        }
        Command::Subscription => {
            let subscription = api.check_subscription().await?;
            println!(
                "premium: {}, free videos used: {}",
                subscription.is_premium, subscription.free_videos_used
            );
        }
        Command::Subscribe { plan } => {
            api.subscribe(plan).await?;
            let subscription = api.check_subscription().await?;
            println!("Subscribed ({}). premium: {}", plan, subscription.is_premium);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_argument_is_parsed() {
        let cli = Cli::try_parse_from(["doc2video", "--mock", "subscribe", "yearly"]).unwrap();
        assert!(cli.mock);
        assert!(matches!(cli.command, Command::Subscribe { plan: Plan::Yearly }));
        assert!(Cli::try_parse_from(["doc2video", "subscribe", "weekly"]).is_err());
    }
}
