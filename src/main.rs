mod app;
mod cli;
mod error;
mod model;
mod msg;
mod plugin;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use app::App;
use cli::Cli;
use model::config::AppConfig;
use model::settings::TomlSettingsStore;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("branch-tester error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "branch-tester")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "branch-tester.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "branch_tester=info".into()),
        )
        .init();

    tracing::info!("branch-tester starting");

    let config = AppConfig::load()?;
    let settings = TomlSettingsStore::open_default()?;
    let mut app = App::new(config, Box::new(settings))?;

    let notices = app.update(cli.command.into());
    for notice in &notices {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }

    if notices.iter().any(|notice| notice.is_error()) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
