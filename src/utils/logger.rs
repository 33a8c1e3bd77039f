use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Level used when `RUST_LOG` is unset or not a level name.
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Parses a `RUST_LOG` value, falling back to [`DEFAULT_LEVEL`].
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.trim().parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}

/// Sets up the stdout logger, level from `RUST_LOG`.
///
/// HTTP internals are capped at `Warn` so request tracing stays readable.
///
/// # Errors
///
/// Returns an error if a logger is already installed.
pub fn setup_logger() -> Result<()> {
    let level = level_from(std::env::var("RUST_LOG").ok().as_deref());
    Dispatch::new()
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                message
            ));
        })
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
