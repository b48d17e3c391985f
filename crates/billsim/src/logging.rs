use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Set up file logging under the data directory.
///
/// Output lands in daily-rotated `billsim.log.<date>` files. The filter runs
/// this crate at `level` and keeps the engine at warn; `RUST_LOG` overrides
/// both.
pub fn init_logging(data_dir: &Path, level: &str) -> color_eyre::Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("billsim={level},billsim_core=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(tracing_appender::rolling::daily(data_dir, "billsim.log"))
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::info!("logging ready in {}", data_dir.display());
    Ok(())
}
