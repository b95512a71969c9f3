//! CLI for PushSub
//!
//! Subcommands:
//! - `server`: run the broker and its WebSocket front door
//! - `publish`: publish one message (useful for smoke tests)
//! - `subscribe`: register an HTTP endpoint for some topics

use std::sync::Arc;

use clap::{Parser, Subcommand};
use pushsub::broker::{Broker, HttpPusher};
use pushsub::client::BrokerClient;
use pushsub::config::{DEFAULT_CONFIG_PATH, load_config_from};
use pushsub::transport::start_websocket_server;
use pushsub::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pushsub", version, about = "HTTP push publish/subscribe broker")]
struct Cli {
    /// Config file, extension optional
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Overrides `log.level` from the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker
    Server,
    /// Publish one message
    Publish {
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long)]
        topic: String,
        message: String,
    },
    /// Register an HTTP endpoint for deliveries
    Subscribe {
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        #[arg(long)]
        address: String,
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
        /// Replay messages the topics still retain
        #[arg(long)]
        read_old: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match load_config_from(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("error");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(cli.log_level.as_deref().unwrap_or(&settings.log.level));

    let result = match cli.command {
        Command::Server => run_server(settings).await,
        Command::Publish {
            url,
            topic,
            message,
        } => run_publish(&url, &topic, &message).await,
        Command::Subscribe {
            url,
            address,
            topics,
            read_old,
        } => run_subscribe(&url, &address, &topics, read_old).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(settings: pushsub::config::Settings) -> pushsub::utils::Result<()> {
    let pusher = Arc::new(HttpPusher::new(settings.request_timeout())?);
    let broker = Arc::new(Broker::new(settings.broker_config(), pusher));
    let _sweepers = broker.start_sweepers();

    let addr = settings.bind_addr();
    tokio::select! {
        res = start_websocket_server(&addr, broker.clone()) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    broker.shutdown();
    Ok(())
}

async fn run_publish(url: &str, topic: &str, message: &str) -> pushsub::utils::Result<()> {
    let mut client = BrokerClient::connect(url).await?;
    let id = client.publish(topic, message).await?;
    info!(topic, id = %id, "published");
    client.close().await
}

async fn run_subscribe(
    url: &str,
    address: &str,
    topics: &[String],
    read_old: bool,
) -> pushsub::utils::Result<()> {
    let mut client = BrokerClient::connect(url).await?;
    let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
    client.subscribe(address, &topics, read_old).await?;
    info!(address, ?topics, "subscribed");
    client.close().await
}
