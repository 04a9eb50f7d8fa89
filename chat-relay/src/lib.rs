//! Real-time chat relay over WebSockets with an in-band exchange-rate
//! command.
//!
//! Each module focuses on a concrete responsibility:
//!
//! - [`cli`] parses the command-line interface for server and client modes.
//! - [`server`] accepts connections, upgrades them to WebSockets and runs one
//!   task per connection.
//! - [`registry`] keeps the live set of connections and their display names,
//!   and fans broadcasts out to them.
//! - [`engine`] routes every inbound message to the broadcast path or the
//!   command path.
//! - [`command`] validates `exchange <N>` and renders the rate history.
//! - [`audit`] appends chat and command lines to the audit log.
//! - [`names`] generates display names.
//! - [`client`] is a small terminal client for talking to a running relay.

pub mod audit;
pub mod cli;
pub mod client;
pub mod command;
pub mod engine;
pub mod names;
pub mod registry;
pub mod server;
