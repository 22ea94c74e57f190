//! Structured logging for the galaxy renderer.
//!
//! Installs a `tracing` subscriber with console output and, in debug builds, a
//! JSON log file. The filter comes from `RUST_LOG` when set, otherwise from
//! `debug.log_level` in the loaded [`Config`].

use galaxy_config::Config;
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives appended to every filter so GPU backends stay quiet.
const GPU_NOISE_DIRECTIVES: &str = "wgpu=warn,naga=warn";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "galaxy.log";

/// Build the filter string for a configured log level.
///
/// An empty level falls back to `info`. The wgpu/naga directives are always
/// appended so per-frame GPU chatter does not drown out the renderer.
pub fn filter_directives(config: Option<&Config>) -> String {
    let level = config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or("info");
    format!("{level},{GPU_NOISE_DIRECTIVES}")
}

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to attach the file layer
/// * `config` - optional configuration supplying the log level
///
/// ```no_run
/// use galaxy_log::init_logging;
/// use galaxy_config::Config;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build && let Some(log_file) = log_dir.and_then(open_log_file) {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Create `log_dir` if needed and truncate the log file inside it. Failure
/// leaves the console as the only sink.
fn open_log_file(log_dir: &Path) -> Option<File> {
    let opened = std::fs::create_dir_all(log_dir)
        .and_then(|()| File::create(log_dir.join(LOG_FILE_NAME)));
    match opened {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("galaxy: log file disabled in {}: {err}", log_dir.display());
            None
        }
    }
}

/// Default filter: `info` everywhere, `warn` for wgpu and naga.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(filter_directives(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter_str = format!("{}", default_env_filter());
        assert!(filter_str.contains("wgpu=warn"));
        assert!(filter_str.contains("naga=warn"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_config_level_is_used() {
        let mut config = Config::default();
        config.debug.log_level = "debug,galaxy_space=trace".to_string();
        let directives = filter_directives(Some(&config));
        assert!(directives.starts_with("debug,galaxy_space=trace"));
        assert!(directives.ends_with(GPU_NOISE_DIRECTIVES));
    }

    #[test]
    fn test_blank_level_falls_back_to_info() {
        let mut config = Config::default();
        config.debug.log_level = "   ".to_string();
        assert_eq!(
            filter_directives(Some(&config)),
            format!("info,{GPU_NOISE_DIRECTIVES}")
        );
    }

    #[test]
    fn test_directives_parse() {
        for level in ["info", "debug,galaxy_render=trace", "warn", "error"] {
            let mut config = Config::default();
            config.debug.log_level = level.to_string();
            let directives = filter_directives(Some(&config));
            assert!(
                EnvFilter::try_new(&directives).is_ok(),
                "Failed to parse filter: {directives}"
            );
        }
    }

    #[test]
    fn test_log_file_created_in_missing_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("galaxy").join("logs");
        assert!(open_log_file(&nested).is_some());
        assert!(nested.join(LOG_FILE_NAME).is_file());
    }

    #[test]
    fn test_log_file_under_a_file_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(open_log_file(&blocker).is_none());
    }
}
