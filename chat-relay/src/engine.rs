use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    audit::{AuditLog, LogEntry},
    command::{CommandOutcome, ExchangeCommand, Inbound},
    registry::{BroadcastReport, ConnectionHandle, Membership, Registry},
};

pub const SHUTDOWN_NOTICE: &str = "server shutting down";

/// What [`Engine::route`] did with a message.
#[derive(Debug)]
pub enum Routed {
    Broadcast(BroadcastReport),
    Command(CommandOutcome),
}

/// Owns the registry and decides, per inbound message, between the
/// broadcast path and the command path.
pub struct Engine {
    registry: Arc<Registry>,
    exchange: ExchangeCommand,
    audit: AuditLog,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, exchange: ExchangeCommand, audit: AuditLog) -> Self {
        Self {
            registry,
            exchange,
            audit,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn join(&self, handle: ConnectionHandle) -> Membership {
        self.registry.register(handle)
    }

    /// Sends a server notice to every member.
    pub fn announce(&self, text: &str) -> BroadcastReport {
        self.registry.broadcast(text)
    }

    /// Tells every member the relay is going away. Members stay registered
    /// until their own sessions end.
    pub fn shutdown(&self) -> BroadcastReport {
        let report = self.announce(SHUTDOWN_NOTICE);
        info!(
            notified = report.delivered,
            unreachable = report.failed.len(),
            "relay shutting down"
        );
        report
    }

    pub async fn route(&self, sender: &Membership, text: &str) -> Routed {
        match Inbound::classify(text) {
            Inbound::Exchange { argument } => {
                debug!(name = %sender.name(), argument, "exchange command");
                let days = match self.exchange.validate(sender, argument) {
                    Ok(days) => days,
                    Err(err) => return Routed::Command(CommandOutcome::Rejected(err)),
                };
                // Audited before the upstream is contacted; the lookup may stall.
                self.record(sender, text).await;
                Routed::Command(self.exchange.run(sender, days).await)
            }
            Inbound::Chat => {
                self.record(sender, text).await;
                let line = format!("{}: {}", sender.name(), text);
                Routed::Broadcast(self.registry.broadcast(&line))
            }
        }
    }

    async fn record(&self, sender: &Membership, text: &str) {
        let entry = LogEntry::new(sender.name(), text);
        if let Err(err) = self.audit.append(&entry).await {
            warn!(error = %err, "audit log append failed");
        }
    }
}
