//! The `galaxy` binary.

use std::process::ExitCode;

use clap::Parser;
use galaxy_app::{AppError, PlatformDirs, window, write_snapshot};
use galaxy_config::{CliArgs, Config};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("galaxy: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<(), AppError> {
    let dirs = match &args.config {
        Some(dir) => PlatformDirs::with_config_dir(dir),
        None => PlatformDirs::resolve()?,
    };
    dirs.create_dirs()?;

    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(&args);
    config.validate()?;

    galaxy_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    tracing::info!("Config directory: {}", dirs.config_dir.display());

    if let Some(path) = &args.snapshot {
        write_snapshot(&config, path, args.frames)?;
        return Ok(());
    }

    window::run(config, dirs.config_dir, args)
}
