use anyhow::Result;
use clap::Parser;
use moode_oled::app::{self, cli::Args, config::AppConfig, logging};
use std::process::ExitCode;

// No #[tokio::main]: its runtime drop would wait on a hung display clear.
fn main() -> Result<ExitCode> {
    human_panic::setup_panic!();

    let args = Args::parse();

    if args.print_config {
        print!("{}", AppConfig::default().to_toml_string());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("moode-oled: {}", e);
            return Ok(ExitCode::from(1));
        }
    };
    args.apply(&mut config);

    let _log_guard = logging::init(&config.logging, args.verbose);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "moode-oled starting");

    match app::block_on_bounded(app::launch(config, &args.lock_file))? {
        Ok(exit) => Ok(ExitCode::from(exit.code())),
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            Ok(ExitCode::from(1))
        }
    }
}
