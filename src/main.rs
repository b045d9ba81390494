//! RM-01 Switcher - serial console tool for the RM-01 carrier board
//!
//! Presents a numbered menu and drives the board's serial console through
//! `tio` to switch modules or force recovery mode.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{debug, error, info, warn};

use rm01_switcher::config::loader::CONFIG_ENV_VAR;
use rm01_switcher::device::TioLister;
use rm01_switcher::error::Result;
use rm01_switcher::session::TioLauncher;
use rm01_switcher::{handle_startup_error, Config, ConfigLoader, Console, Menu, Switcher};

/// Environment variable enabling debug logging
const DEBUG_ENV_VAR: &str = "RM01_SWITCHER_DEBUG";

/// Command line arguments
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug logging
    debug: bool,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut app_args = AppArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => app_args.config_path = Some(PathBuf::from(path)),
                    None => return Err("Missing config file path".into()),
                },
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--help" | "-?" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("{} v{}", rm01_switcher::NAME, rm01_switcher::VERSION);
                    process::exit(0);
                }
                other if other.starts_with('-') => {
                    return Err(format!("Unknown option: {}", other).into());
                }
                other => {
                    warn!("Ignoring positional argument: {}", other);
                }
            }
        }

        Ok(app_args)
    }
}

/// Print help information
fn print_help() {
    println!("{} - {}", rm01_switcher::NAME, rm01_switcher::DESCRIPTION);
    println!();
    println!("USAGE:");
    println!("    rm01-switcher [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Path to configuration file");
    println!("    -d, --debug            Enable debug logging");
    println!("    -?, --help             Print this help message");
    println!("    -v, --version          Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    Configuration files are looked up in the following order:");
    println!("    1. Path specified with --config");
    println!("    2. ${}", CONFIG_ENV_VAR);
    println!("    3. $XDG_CONFIG_HOME/rm01-switcher/config.toml");
    println!("    4. ~/.config/rm01-switcher/config.toml");
    println!("    5. ~/.rm01-switcher/config.toml");
    println!("    6. Built-in defaults");
    println!();
    println!("ENVIRONMENT:");
    println!("    {}   Path to configuration file", CONFIG_ENV_VAR);
    println!("    {}    Enable debug logging (1 or true)", DEBUG_ENV_VAR);
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
    println!();
    println!("REQUIREMENTS:");
    println!("    tio must be installed and on PATH.");
}

fn init_logging(args: &AppArgs) {
    let debug_env = env::var(DEBUG_ENV_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let log_level = if args.debug || debug_env { "debug" } else { "info" };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Load configuration, falling back to defaults when the file is unusable
fn load_configuration(args: &AppArgs) -> Config {
    match ConfigLoader::new().load(args.config_path.as_deref()) {
        Ok((config, Some(path))) => {
            info!("Configuration loaded from: {}", path.display());
            config
        }
        Ok((config, None)) => {
            debug!("Using default configuration");
            config
        }
        Err(e) => {
            warn!("Failed to load configuration: {}", e);
            eprintln!("{}", handle_startup_error(&e));
            eprintln!("Falling back to default configuration");
            Config::default()
        }
    }
}

/// Report a fatal error and hold the window open until the operator reacts
fn exit_with_error(message: &str) -> ! {
    println!("\nAn error occurred: {}", message);
    println!("\nPress ENTER to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
    process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(1);
    });

    init_logging(&args);
    info!("Starting {} v{}", rm01_switcher::NAME, rm01_switcher::VERSION);
    debug!("Arguments: {:?}", args);

    let config = load_configuration(&args);
    let switcher = match Switcher::new(
        &config,
        Arc::new(TioLister::from_config(&config.terminal)),
        Arc::new(TioLauncher::from_config(&config.terminal)),
    ) {
        Ok(switcher) => switcher,
        Err(e) => {
            error!("Failed to set up switcher: {}", e);
            exit_with_error(&handle_startup_error(&e));
        }
    };
    info!("Using serial device {}", switcher.device());

    let console = Console::new(BufReader::new(tokio::io::stdin()), io::stdout());
    let mut menu = Menu::new(switcher, console);
    menu.print_logo();

    let result = tokio::select! {
        result = menu.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            println!("\n\nProgram interrupted");
            // Dropping the menu kills any terminal program still running
            drop(menu);
            process::exit(0);
        }
    };

    match result {
        Ok(()) => {
            info!("Exiting");
        }
        Err(e) => {
            error!("Menu loop failed: {}", e);
            exit_with_error(&e.to_string());
        }
    }
}
