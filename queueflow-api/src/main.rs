//! QueueFlow messaging API
//!
//! Serves `/status`, `/enqueue` and `/publish` over HTTP, or as an AWS Lambda
//! function when started by the Lambda runtime.

use clap::Parser;
use queueflow_api::{create_router, lambda::LambdaRuntime, MessagingApi};
use queueflow_core::{logging, shutdown, MessagingConfig};
use queueflow_sns::SnsTopicClient;
use queueflow_sqs::SqsQueueClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "queueflow-api")]
#[command(about = "HTTP API that enqueues to SQS or publishes to SNS", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "QUEUEFLOW_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "QUEUEFLOW_HOST")]
    host: String,

    /// Configuration file (defaults to ./queueflow.toml when present)
    #[arg(short, long, env = "QUEUEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Lambda Runtime API endpoint; when set, serve Lambda invocations
    /// instead of listening for HTTP
    #[arg(long, env = "AWS_LAMBDA_RUNTIME_API")]
    lambda_runtime_api: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "QUEUEFLOW_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "QUEUEFLOW_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_json);

    let config = MessagingConfig::load(args.config.as_deref())?;
    let sdk_config = config.aws_sdk_config().await;

    let api = Arc::new(MessagingApi::new(
        config,
        Arc::new(SqsQueueClient::from_conf(&sdk_config)),
        Arc::new(SnsTopicClient::from_conf(&sdk_config)),
    ));

    let shutdown = shutdown::on_shutdown_signal();

    if let Some(runtime_api) = args.lambda_runtime_api.as_deref() {
        LambdaRuntime::new(runtime_api).run(&api, shutdown).await?;
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_router(api))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
