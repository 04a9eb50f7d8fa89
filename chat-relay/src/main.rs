use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use exchange_client::ExchangeClient;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_relay::{
    audit::AuditLog,
    cli::{Cli, Command, ServeArgs},
    client,
    command::ExchangeCommand,
    engine::Engine,
    registry::Registry,
    server::Server,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

async fn serve(args: ServeArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;

    let rates = ExchangeClient::new().with_base_url(args.exchange_api);
    let engine = Engine::new(
        Registry::new(),
        ExchangeCommand::new(Arc::new(rates)),
        AuditLog::new(args.audit_log),
    );
    let server = Server::new(listener, Arc::new(engine));

    let addr = server.local_addr()?;
    info!("relay listening on {}", addr);
    if let Err(err) = server.run_until_ctrl_c().await {
        warn!("relay exited with error: {err:?}");
        return Err(err);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await?,
        Command::Client(args) => client::run(args).await?,
    }

    Ok(())
}
