use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when neither `--log-filter` nor `RUST_LOG` is set
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber
///
/// Logs go to stderr so stdout carries only the model's answer.
pub fn init(log_filter: Option<&str>, json: bool) -> anyhow::Result<()> {
    let filter = match log_filter {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| anyhow::anyhow!("invalid log filter '{directive}': {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);

        tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);

        tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
    }

    Ok(())
}
