use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// Install the global subscriber, logging to stderr so stdout stays free for
/// command output. `RUST_LOG` overrides the `info` default; `json` switches
/// to one JSON object per event.
pub fn init(json: bool) -> Result<(), LoggingError> {
    subscriber(json, std::io::stderr).try_init()?;
    Ok(())
}

pub fn subscriber<W>(json: bool, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (plain, structured) = if json {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .json()
            .with_writer(writer);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(writer);
        (Some(layer), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(structured)
}
