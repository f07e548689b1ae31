//! Structured logging for the Vitalis viewer.
//!
//! Console output with uptime timestamps and targets, plus a JSON file log in debug
//! builds. The level comes from `RUST_LOG` when set, otherwise from the config's
//! `debug.log_level`. Records emitted through the `log` facade (the config loader uses
//! it) are bridged into the same subscriber.

use std::fs::File;
use std::path::Path;

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vitalis_config::Config;

/// Directives used when neither `RUST_LOG` nor the config says otherwise.
pub const DEFAULT_DIRECTIVES: &str = "info,gltf=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "vitalis.log";

/// Install the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to write the JSON file log
/// * `config` - supplies the log level when `RUST_LOG` is unset
///
/// ```no_run
/// use vitalis_config::Config;
/// use vitalis_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let directives = filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true) // fetch workers are named
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = File::create(log_dir.join(LOG_FILE_NAME))
    {
        subscriber.with(json_file_layer(log_file)).init();
        return;
    }

    subscriber.init();
}

/// Filter directives from the config, falling back to [`DEFAULT_DIRECTIVES`].
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

/// JSON lines, no ANSI codes, uptime timestamps.
pub fn json_file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .json()
}
