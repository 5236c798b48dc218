//! lazy-launcher: the privileged launcher process and a small view client.
//!
//! ## Subcommands
//!
//! - `serve` (default): run the launcher. View surfaces connect over the
//!   socket; stdin is the privileged menu console.
//! - `send`: issue one view command and print the response
//! - `watch`: subscribe and print theme/locale broadcasts

mod client;
mod logging;
mod menu;
mod server;

use clap::{Parser, Subcommand};
use launcher_core::{
    load_runtime_config, platform, runtime, ConfigStore, HeadlessChrome, RuntimeConfig,
    StateSyncBroker, SystemAppearance,
};
use lazy_launcher_protocol::Request;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lazy-launcher")]
#[command(about = "Start project command sequences and open terminals")]
#[command(version)]
struct Cli {
    /// Socket path (overrides launcher.toml)
    #[arg(long, global = true, value_name = "PATH")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the launcher
    Serve {
        /// Do not read menu commands from stdin
        #[arg(long)]
        no_console: bool,
    },

    /// Send one command and print the JSON response
    Send {
        /// Command name (e.g., start-project)
        #[arg(value_name = "COMMAND")]
        command: String,

        /// JSON payload
        #[arg(long)]
        payload: Option<String>,

        /// Correlation id echoed in the response
        #[arg(long)]
        id: Option<String>,
    },

    /// Print theme/locale broadcasts as they arrive
    Watch,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve { no_console: false });
    let store = ConfigStore::from_user_dirs();

    // Only the long-running launcher writes a log file.
    let log_dir = match (&command, &store) {
        (Commands::Serve { .. }, Ok(store)) => Some(store.logs_dir()),
        _ => None,
    };
    let logging_guard = logging::init(log_dir.as_deref());

    let result = match command {
        Commands::Serve { no_console } => store
            .map_err(String::from)
            .and_then(|store| serve(store, cli.socket, !no_console)),
        Commands::Send {
            command,
            payload,
            id,
        } => send(store, cli.socket, command, payload, id),
        Commands::Watch => watch(store, cli.socket),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "lazy-launcher failed");
        drop(logging_guard);
        std::process::exit(1);
    }
}

fn runtime_config(store: &ConfigStore) -> RuntimeConfig {
    match load_runtime_config(&store.runtime_config_file()) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to load runtime config; using defaults");
            RuntimeConfig::default()
        }
    }
}

fn socket_path(
    store: launcher_core::Result<ConfigStore>,
    flag: Option<PathBuf>,
) -> Result<PathBuf, String> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let store = store.map_err(String::from)?;
    Ok(runtime_config(&store)
        .socket_path
        .unwrap_or_else(|| store.socket_file()))
}

fn serve(store: ConfigStore, socket_flag: Option<PathBuf>, console: bool) -> Result<(), String> {
    if let Err(err) = store.ensure_root() {
        tracing::warn!(error = %err, "Failed to create config directory; state will not persist");
    }
    let config = runtime_config(&store);
    let socket = socket_flag
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(|| store.socket_file());

    let launcher = platform::detect(&config);
    tracing::info!(
        platform = launcher.platform(),
        root = %store.root().display(),
        "Lazy Project Launcher starting"
    );

    let broker = StateSyncBroker::load(store, Box::new(SystemAppearance), Box::new(HeadlessChrome));
    let (handle, runtime_thread) = runtime::spawn(launcher, broker)
        .map_err(|err| format!("Failed to start runtime: {}", err))?;

    let transport = match server::start(&socket, handle.clone()) {
        Ok(thread) => Some(thread),
        Err(err) if console => {
            tracing::error!(error = %err, "View transport unavailable; console only");
            None
        }
        Err(err) => {
            handle.shutdown();
            return Err(err);
        }
    };

    if console {
        let exit = menu::run(io::stdin().lock(), io::stdout(), &handle)
            .map_err(|err| format!("Menu console failed: {}", err))?;
        if exit == menu::ConsoleExit::Quit {
            tracing::info!("Quit requested");
            handle.shutdown();
            let _ = runtime_thread.join();
            if transport.is_some() {
                let _ = fs_err::remove_file(&socket);
            }
            return Ok(());
        }
        tracing::info!("Console input closed; serving views until terminated");
    }

    if let Some(transport) = transport {
        let _ = transport.join();
    }
    let _ = runtime_thread.join();
    Ok(())
}

fn send(
    store: launcher_core::Result<ConfigStore>,
    socket_flag: Option<PathBuf>,
    command: String,
    payload: Option<String>,
    id: Option<String>,
) -> Result<(), String> {
    let socket = socket_path(store, socket_flag)?;
    let payload = payload
        .map(|raw| {
            serde_json::from_str::<serde_json::Value>(&raw)
                .map_err(|err| format!("Invalid --payload JSON: {}", err))
        })
        .transpose()?;

    let request = Request {
        command,
        id,
        payload,
    };
    let response = client::send(&socket, &request)?;
    let rendered = serde_json::to_string(&response)
        .map_err(|err| format!("Failed to render response: {}", err))?;
    println!("{rendered}");

    if response.success {
        Ok(())
    } else {
        Err(response
            .message
            .unwrap_or_else(|| "command failed".to_string()))
    }
}

fn watch(store: launcher_core::Result<ConfigStore>, socket_flag: Option<PathBuf>) -> Result<(), String> {
    let socket = socket_path(store, socket_flag)?;
    let initial = client::watch(&socket, |event| match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::warn!(error = %err, "Failed to render broadcast"),
    })?;

    if initial.success {
        tracing::info!("Launcher closed the subscription");
        Ok(())
    } else {
        Err(initial
            .message
            .unwrap_or_else(|| "subscribe failed".to_string()))
    }
}
