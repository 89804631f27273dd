use std::fs::File;
use std::sync::Arc;

use astro::core::config::{self, AstroConfig, CliOverrides};
use astro::core::session::PendingPolicy;
use astro::transport::{ConnectOptions, SocketIoTransport, Transport};
use astro::tui;
use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "astro", about = "Terminal chat client for a Socket.IO chat backend")]
struct Args {
    /// Chat server base URL (http, https, ws or wss)
    #[arg(short, long)]
    server: Option<String>,

    /// What a second send does while a reply is still pending
    #[arg(long, value_enum)]
    pending_policy: Option<PendingPolicy>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to astro.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("astro.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("{}; falling back to defaults", e);
        eprintln!("Warning: {e}; using default settings");
        AstroConfig::default()
    });
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            server_url: args.server,
            pending_policy: args.pending_policy,
        },
    );

    log::info!(
        "Astro starting up against {} (pending policy: {:?})",
        resolved.server_url,
        resolved.pending_policy
    );

    eprintln!("Connecting to {}...", resolved.server_url);
    let options = ConnectOptions::new(resolved.server_url.clone())
        .with_connect_timeout(resolved.connect_timeout);
    let transport = SocketIoTransport::connect(&options).await.map_err(|e| {
        log::error!("Could not connect to {}: {}", resolved.server_url, e);
        std::io::Error::other(e)
    })?;
    let transport: Arc<dyn Transport> = Arc::new(transport);

    // The UI loop blocks; keep the runtime's other workers free for the socket task.
    let result = tokio::task::block_in_place(|| tui::run(transport.clone(), &resolved));

    transport.close().await;
    log::info!("Astro shut down");
    result
}
