use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message, error::ProtocolError};
use tracing::{debug, warn};

use crate::{
    engine::Engine,
    registry::{ConnectionHandle, Membership},
};

pub struct Server {
    listener: TcpListener,
    engine: Arc<Engine>,
}

impl Server {
    pub fn new(listener: TcpListener, engine: Arc<Engine>) -> Self {
        Self { listener, engine }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, engine } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    engine.shutdown();
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => spawn_session(stream, peer, Arc::clone(&engine)),
                    Err(err) => warn!(error = ?err, "failed to accept connection"),
                },
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// One task per connection; a failing session never reaches the accept loop.
fn spawn_session(stream: TcpStream, peer: SocketAddr, engine: Arc<Engine>) {
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, peer, engine).await {
            warn!(peer = %peer, error = ?err, "client connection closed with error");
        }
    });
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, engine: Arc<Engine>) -> Result<()> {
    let socket = tokio_tungstenite::accept_async(stream)
        .await
        .with_context(|| format!("websocket handshake with {peer} failed"))?;
    let (sink, mut inbound) = socket.split();

    let (outbox, queued) = mpsc::unbounded_channel();
    tokio::spawn(drain_outbox(sink, queued));

    let handle = ConnectionHandle::new(engine.registry().next_id(), Some(peer), outbox);
    // Dropping the membership unregisters the connection, however the
    // session below ends.
    let member = engine.join(handle);
    let session = run_session(&engine, &member, &mut inbound).await;
    drop(member);

    session
}

async fn run_session<S>(engine: &Engine, member: &Membership, inbound: &mut S) -> Result<()>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                engine.route(member, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                debug!(name = %member.name(), "ignoring binary frame");
            }
            Ok(_) => {}
            Err(err) if is_graceful_close(&err) => break,
            Err(err) => {
                return Err(err).with_context(|| format!("session for {} failed", member.name()));
            }
        }
    }

    debug!(name = %member.name(), "client closed the session");
    Ok(())
}

fn is_graceful_close(err: &WsError) -> bool {
    matches!(
        err,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

async fn drain_outbox<S>(mut sink: S, mut queued: mpsc::UnboundedReceiver<String>)
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(text) = queued.recv().await {
        if let Err(err) = sink.send(Message::Text(text)).await {
            // Closing the queue makes the next broadcast drop this member.
            debug!(?err, "failed to deliver message to client");
            return;
        }
    }

    if let Err(err) = sink.close().await {
        debug!(?err, "failed to close websocket cleanly");
    }
}
