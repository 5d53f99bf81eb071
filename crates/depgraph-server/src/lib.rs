//! Depgraph Server - WebSocket server for graph collaborators
//!
//! This crate publishes the built graph to rendering and selection clients.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - JSON-RPC 2.0 messages
//! - A full graph snapshot on connect and after every rebuild
//! - Node selection broadcasts
//! - Watching the summary cache with debounced full rebuilds

use depgraph_graph::BuildOutput;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The published build, shared across connections.
pub type SharedGraph = Arc<RwLock<BuildOutput>>;

mod handle;
mod handlers;
mod protocol;
mod server;
mod watcher;

pub use handle::{BroadcastMessage, GraphUpdatePayload, RebuildError, ServerHandle};
pub use protocol::{NodeParams, RebuildParams, Request, Response, RpcError};
pub use server::{process_message, DepgraphServer, ServerConfig};
pub use watcher::{Debouncer, SummaryWatcher};
