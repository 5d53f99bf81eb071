//! WebSocket server implementation.
//!
//! Each client gets a full graph snapshot on connect, can issue JSON-RPC
//! requests, and receives every broadcast while connected.

use crate::handle::{BroadcastMessage, ServerHandle};
use crate::handlers::{
    handle_diagnostics, handle_edges, handle_info, handle_node_get, handle_node_select,
    handle_nodes, handle_rebuild,
};
use crate::protocol::{NodeParams, RebuildParams, Request, Response};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Loopback on `port`, or every interface when headless.
    pub fn for_port(port: u16, headless: bool) -> Self {
        let ip = if headless { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
        Self {
            addr: SocketAddr::from((ip, port)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::for_port(7432, false)
    }
}

/// The depgraph WebSocket server.
pub struct DepgraphServer {
    config: ServerConfig,
    handle: ServerHandle,
}

impl DepgraphServer {
    pub fn new(handle: ServerHandle, config: ServerConfig) -> Self {
        Self { config, handle }
    }

    /// Returns a handle for rebuilding and broadcasting from outside.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Runs the server, accepting connections forever.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Depgraph server listening on ws://{}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let handle = self.handle.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, addr, handle).await {
                            warn!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket client connection.
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    handle: ServerHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    // subscribe before the snapshot so no rebuild slips between them
    let mut broadcast_rx = handle.subscribe();
    info!("WebSocket connection established with {}", addr);

    let snapshot = BroadcastMessage::GraphUpdate(handle.snapshot().await);
    write
        .send(Message::Text(serde_json::to_string(&snapshot)?))
        .await?;
    debug!("Sent initial snapshot to {}", addr);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = process_message(&text, &handle).await;
                        write.send(Message::Text(serde_json::to_string(&response)?)).await?;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Message error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            msg = broadcast_rx.recv() => {
                match msg {
                    Ok(broadcast) => {
                        let json = serde_json::to_string(&broadcast)?;
                        if write.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", addr, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

/// Processes a JSON-RPC message and returns a response.
pub async fn process_message(text: &str, handle: &ServerHandle) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Processing method: {}", method);

    match method {
        "graph.info" => handle_info(handle, id).await,
        "graph.nodes" => handle_nodes(handle, id).await,
        "graph.edges" => handle_edges(handle, id).await,
        "graph.diagnostics" => handle_diagnostics(handle, id).await,

        "node.get" => match serde_json::from_value::<NodeParams>(request.params) {
            Ok(params) => handle_node_get(handle, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "node.select" => match serde_json::from_value::<NodeParams>(request.params) {
            Ok(params) => handle_node_select(handle, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        "graph.rebuild" => match serde_json::from_value::<RebuildParams>(request.params) {
            Ok(params) => handle_rebuild(handle, id, params).await,
            Err(e) => Response::invalid_params(id, e.to_string()),
        },

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_graph::BuildOutput;

    #[tokio::test]
    async fn test_routing() {
        let handle = ServerHandle::new(BuildOutput::default(), None);

        let response = process_message("not json", &handle).await;
        assert_eq!(response.error.unwrap().code, -32700);

        let response =
            process_message(r#"{"jsonrpc":"2.0","id":1,"method":"graph.nope"}"#, &handle).await;
        assert_eq!(response.error.unwrap().code, -32601);

        let response =
            process_message(r#"{"jsonrpc":"2.0","id":2,"method":"node.get"}"#, &handle).await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = process_message(
            r#"{"jsonrpc":"2.0","id":3,"method":"graph.rebuild","params":{"files":[{"file_name":"a.py"}]}}"#,
            &handle,
        )
        .await;
        assert!(response.error.is_none());

        let response =
            process_message(r#"{"jsonrpc":"2.0","id":4,"method":"graph.nodes"}"#, &handle).await;
        let nodes = response.result.unwrap();
        assert_eq!(nodes[0]["id"], "a.py");
    }

    #[test]
    fn test_headless_binds_everywhere() {
        assert_eq!(ServerConfig::for_port(9000, false).addr.to_string(), "127.0.0.1:9000");
        assert_eq!(ServerConfig::for_port(9000, true).addr.to_string(), "0.0.0.0:9000");
    }
}
