//! Tracing setup for the QueueFlow binaries

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: [&str; 5] = [
    "queueflow_core",
    "queueflow_sqs",
    "queueflow_sns",
    "queueflow_api",
    "queueflow_worker",
];

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise every QueueFlow crate logs at
/// `log_level`. JSON output suits log collectors such as CloudWatch.
pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn default_directives(log_level: &str) -> String {
    let mut directives: Vec<String> = CRATES
        .iter()
        .map(|krate| format!("{krate}={log_level}"))
        .collect();
    directives.push("tower_http=debug".to_string());
    directives.join(",")
}
