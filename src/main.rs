mod build_info;

use arena::core::constants::DEFAULT_PORT;
use arena::engine::{EngineConfig, GameEngine};
use arena::events::EventSink;
use arena::store::{FileStore, MemoryStore, PlayerStore};
use arena::web::{start_server, ConnectionRegistry};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Arena - browser RPG battle server\n");
    println!("Usage: arena [options]\n");
    println!("Options:");
    println!("  --port=N     Listen port (default {})", DEFAULT_PORT);
    println!("  --ephemeral  Keep accounts in memory only (no snapshot file)");
    println!("  --version    Show version information");
    println!("  --help       Show this help message");
}

struct Options {
    port: u16,
    ephemeral: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        port: DEFAULT_PORT,
        ephemeral: false,
    };

    for arg in args {
        if let Some(value) = arg.strip_prefix("--port=") {
            options.port = value
                .parse()
                .map_err(|_| format!("invalid port: {}", value))?;
        } else if arg == "--ephemeral" {
            options.ephemeral = true;
        } else {
            return Err(format!("unknown option: {}", arg));
        }
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!(
            "arena {} ({})",
            build_info::BUILD_DATE,
            build_info::BUILD_COMMIT
        );
        return Ok(());
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Run 'arena --help' for usage.");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store: Arc<dyn PlayerStore> = if options.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        match FileStore::open_default() {
            Ok(store) => Arc::new(store),
            Err(err) => {
                eprintln!("failed to open account snapshot: {}", err);
                std::process::exit(1);
            }
        }
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let sink: Arc<dyn EventSink> = registry.clone();
    let engine = GameEngine::new(store, sink, EngineConfig::default());

    start_server(options.port, engine, registry).await
}
