//! Relay one source to stdout through the routing core
//!
//! Run with: cargo run --example relay [SOURCE] [QUERY]
//!
//! Examples:
//!   cargo run --example relay                                       # test pattern via ffmpeg
//!   cargo run --example relay "tcp://127.0.0.1:9000#video=mjpeg" video=mjpeg
//!   cargo run --example relay "exec:cat /dev/urandom" > /dev/null
//!
//! Packets go to stdout, logs to stderr (`RUST_LOG=mediagate=trace` for
//! per-track detail). The source is dialled when the relay consumer binds
//! and redialled if it drops.
//!
//! ## Features
//!
//! - Lazy dial: nothing runs until a consumer asks for the stream
//! - Reconnect: a dropped source is redialled without touching the consumer
//! - Introspection: the stream table is printed as JSON on exit

use std::sync::Arc;
use std::time::Duration;

use mediagate::consumer::WriterConsumer;
use mediagate::media::parse_query;
use mediagate::source::{self, SourceOptions};
use mediagate::{Consumer, Handlers, RegistryConfig, StreamRegistry, StreamsConfig};

const DEFAULT_SOURCE: &str =
    "exec:ffmpeg -hide_banner -re -f lavfi -i testsrc=size=640x360:rate=10 -f mjpeg -#video=mjpeg";
const DEFAULT_QUERY: &str = "video=mjpeg";

fn print_usage() {
    eprintln!("Usage: relay [SOURCE] [QUERY]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SOURCE    exec: or tcp:// source URL (default: ffmpeg test pattern)");
    eprintln!("  QUERY     media request, e.g. video=mjpeg (default: {})", DEFAULT_QUERY);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let source_url = args.get(1).map(String::as_str).unwrap_or(DEFAULT_SOURCE);
    let query = args.get(2).map(String::as_str).unwrap_or(DEFAULT_QUERY);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediagate=debug".parse()?)
                .add_directive("relay=debug".parse()?),
        )
        .init();

    let handlers = source::register(
        Handlers::new(),
        SourceOptions::default().read_deadline(Duration::from_secs(10)),
    );
    let config = RegistryConfig::default().idle_grace(Duration::from_secs(2));
    let registry = Arc::new(StreamRegistry::with_config(handlers, config));
    let _cleanup = registry.spawn_cleanup_task();

    let errors = registry
        .load(&StreamsConfig::new().stream("relay", [source_url]))
        .await;
    if let Some(err) = errors.first() {
        eprintln!("Error: {}", err);
        print_usage();
        std::process::exit(1);
    }

    let stream = registry.get("relay").await?;
    let consumer = Arc::new(
        WriterConsumer::new(parse_query(query), tokio::io::stdout())
            .with_format("stdout")
            .with_remote("local"),
    );
    let id = stream.add_consumer(consumer.clone()).await?;

    tokio::select! {
        _ = consumer.closed() => {
            eprintln!("Output closed");
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nShutting down...");
            stream.remove_consumer(id).await;
        }
    }

    let table = registry.all().await;
    eprintln!("{}", serde_json::to_string_pretty(&table)?);

    registry.shutdown().await;
    Ok(())
}
