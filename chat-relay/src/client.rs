use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    select,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{info, warn};

use crate::cli::ClientArgs;

pub async fn run(args: ClientArgs) -> Result<()> {
    let (socket, _) = tokio_tungstenite::connect_async(args.server.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!("connected to {}", args.server);

    let (mut writer, mut reader) = socket.split();
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    loop {
        input.clear();
        select! {
            frame = reader.next() => {
                if !handle_server_frame(frame).await? {
                    break;
                }
            }
            bytes_read = stdin.read_line(&mut input) => {
                let action = if bytes_read? == 0 {
                    StdinAction::Quit
                } else {
                    interpret_line(&input)
                };
                match action {
                    StdinAction::Send(text) => writer.send(Message::Text(text)).await?,
                    StdinAction::Skip => {}
                    StdinAction::Quit => {
                        write_stdout("*** leaving chat").await?;
                        break;
                    }
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if let Err(error) = writer.close().await {
        warn!(?error, "failed to close connection cleanly");
    }
    Ok(())
}

async fn handle_server_frame(frame: Option<Result<Message, WsError>>) -> Result<bool> {
    match frame {
        Some(Ok(Message::Text(text))) => {
            write_stdout(&text).await?;
            Ok(true)
        }
        Some(Ok(Message::Close(_))) | None => {
            write_stdout("*** server closed the connection").await?;
            Ok(false)
        }
        Some(Ok(_)) => Ok(true),
        Some(Err(err)) => Err(err.into()),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StdinAction {
    Send(String),
    Skip,
    Quit,
}

fn interpret_line(input: &str) -> StdinAction {
    let text = input.trim_end();
    if text.trim().is_empty() {
        return StdinAction::Skip;
    }
    if text.eq_ignore_ascii_case("/quit") {
        return StdinAction::Quit;
    }
    StdinAction::Send(text.to_string())
}

async fn write_stdout(text: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
