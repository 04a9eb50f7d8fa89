use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use exchange_client::DEFAULT_BASE_URL;

use crate::audit::DEFAULT_AUDIT_LOG;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat relay, accepting WebSocket connections.
    Serve(ServeArgs),
    /// Connect to a relay and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the relay binds to. Use port 0 for an ephemeral port.
    #[arg(long, env = "CHAT_RELAY_LISTEN", default_value = "localhost:8080")]
    pub listen: String,

    /// File that chat lines and exchange commands are appended to.
    #[arg(long, env = "CHAT_RELAY_AUDIT_LOG", default_value = DEFAULT_AUDIT_LOG)]
    pub audit_log: PathBuf,

    /// Exchange-rate endpoint queried by the `exchange <N>` command.
    #[arg(long, env = "EXCHANGE_API_URL", default_value = DEFAULT_BASE_URL)]
    pub exchange_api: String,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// WebSocket URL of the relay.
    #[arg(long, default_value = "ws://localhost:8080")]
    pub server: String,
}
