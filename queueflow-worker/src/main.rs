//! QueueFlow queue worker
//!
//! Long-polls the configured queue and deletes every message it receives.

use clap::Parser;
use queueflow_core::{logging, shutdown, ConfigError, MessagingConfig};
use queueflow_sqs::{ReceiveOptions, SqsQueueClient};
use queueflow_worker::{Consumer, ConsumerSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "queueflow-worker")]
#[command(about = "Long-polling SQS consumer", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./queueflow.toml when present)
    #[arg(short, long, env = "QUEUEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Largest batch requested per receive
    #[arg(
        long,
        default_value = "5",
        env = "QUEUEFLOW_MAX_MESSAGES",
        value_parser = clap::value_parser!(i32).range(1..=10)
    )]
    max_messages: i32,

    /// Long-poll wait per receive, in seconds
    #[arg(
        long,
        default_value = "20",
        env = "QUEUEFLOW_WAIT_TIME_SECONDS",
        value_parser = clap::value_parser!(u64).range(0..=20)
    )]
    wait_time_seconds: u64,

    /// How long received messages stay hidden, in seconds
    #[arg(long, default_value = "30", env = "QUEUEFLOW_VISIBILITY_TIMEOUT_SECONDS")]
    visibility_timeout_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "QUEUEFLOW_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "QUEUEFLOW_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            max_messages: self.max_messages,
            wait_time: Duration::from_secs(self.wait_time_seconds),
            visibility_timeout: Duration::from_secs(self.visibility_timeout_seconds),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_json);

    let config = MessagingConfig::load(args.config.as_deref())?;
    let settings = match ConsumerSettings::from_config(&config) {
        Ok(settings) => settings.with_receive(args.receive_options()),
        Err(e @ ConfigError::MissingQueueUrl) => {
            // Nothing to consume; not a failure
            error!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let sdk_config = config.aws_sdk_config().await;
    let consumer = Consumer::new(Arc::new(SqsQueueClient::from_conf(&sdk_config)), settings);

    consumer.run(shutdown::on_shutdown_signal()).await?;

    info!("Worker exited");
    Ok(())
}
