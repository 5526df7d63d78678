use std::{
    env,
    error::Error,
    fs::OpenOptions,
    path::PathBuf,
    process,
    sync::Mutex,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use supervisord_tui::{
    cli::{Cli, parse_args},
    constants::LOG_FILE_NAME,
    error::SupervisorError,
    gateway::Gateway,
    locate::Locator,
    session::Session,
    tui,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    let mut session = match open_session(&args) {
        Ok(session) => session,
        Err(err) => {
            error!("Startup failed: {err}");
            eprintln!("Error initializing application: {err}");
            process::exit(1);
        }
    };

    tui::run(&mut session)?;
    info!("Session closed");
    Ok(())
}

fn open_session(args: &Cli) -> Result<Session, SupervisorError> {
    let config_path = resolve_config_path(args)?;
    info!("Using supervisord config {}", config_path.display());
    Session::open(&config_path, Gateway::system())
}

fn resolve_config_path(args: &Cli) -> Result<PathBuf, SupervisorError> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Locator::from_env().locate(),
    }
}

/// The terminal belongs to the UI, so logs go to a file in the temp dir.
fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    if let Err(err) = try_init_file_logging(filter) {
        eprintln!("warning: logging disabled: {err}");
    }
}

fn try_init_file_logging(filter: EnvFilter) -> Result<(), Box<dyn Error + Send + Sync>> {
    let path = env::temp_dir().join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()?;
    Ok(())
}
