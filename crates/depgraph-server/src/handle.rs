//! Shared server state: the published graph, the broadcast channel, and
//! the build gate.
//!
//! Rebuilds run on the blocking pool behind a mutex, so two builds never
//! overlap. The published [`BuildOutput`] is replaced in one write, so a
//! reader holds either the old graph or the new one. A build that runs
//! past its time limit is abandoned and the previous graph stays.

use crate::SharedGraph;
use depgraph_core::{ParsedSummary, SummaryCache, SummaryError};
use depgraph_graph::{build_parsed, BuildOutput, BuildStats, GraphEdge, Node, NodeDetail};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinError;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("build timed out after {0:?}")]
    Timeout(Duration),
    #[error("build task failed: {0}")]
    Join(#[from] JoinError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Messages pushed to every connected client.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BroadcastMessage {
    /// Full graph snapshot, sent on connect and after every rebuild.
    GraphUpdate(GraphUpdatePayload),
    /// A non-file node was selected.
    NodeSelected(NodeDetail),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphUpdatePayload {
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub diagnostic_count: usize,
    /// RFC 3339 time the payload was taken.
    pub timestamp: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<GraphEdge>,
}

impl GraphUpdatePayload {
    pub fn snapshot(output: &BuildOutput) -> Self {
        let graph = &output.graph;
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            file_count: graph.stats().files,
            diagnostic_count: output.diagnostics.len(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            nodes: graph.nodes().cloned().collect(),
            edges: graph.export_edges(),
        }
    }
}

/// A cloneable handle to the published graph.
#[derive(Clone)]
pub struct ServerHandle {
    graph: SharedGraph,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
    gate: Arc<Mutex<()>>,
    build_timeout: Option<Duration>,
}

impl ServerHandle {
    pub fn new(output: BuildOutput, build_timeout: Option<Duration>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        Self {
            graph: Arc::new(RwLock::new(output)),
            broadcast_tx,
            gate: Arc::new(Mutex::new(())),
            build_timeout,
        }
    }

    /// Returns the shared graph.
    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    /// Returns a broadcast receiver for server messages.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Sends a message to every subscriber. Having none is fine.
    pub fn broadcast(&self, msg: BroadcastMessage) {
        let _ = self.broadcast_tx.send(msg);
    }

    /// Snapshot of the currently published graph.
    pub async fn snapshot(&self) -> GraphUpdatePayload {
        GraphUpdatePayload::snapshot(&*self.graph.read().await)
    }

    /// Rebuilds from a summary and publishes the result.
    pub async fn rebuild(&self, parsed: ParsedSummary) -> Result<BuildStats, RebuildError> {
        self.run_build(move || Ok(build_parsed(&parsed))).await
    }

    /// Reloads every cached summary, rebuilds and publishes.
    pub async fn rebuild_from_cache(&self, cache: SummaryCache) -> Result<BuildStats, RebuildError> {
        self.run_build(move || Ok(build_parsed(&cache.load_project()?)))
            .await
    }

    async fn run_build<F>(&self, build: F) -> Result<BuildStats, RebuildError>
    where
        F: FnOnce() -> Result<BuildOutput, SummaryError> + Send + 'static,
    {
        // held by the build task until it finishes, even if we stop waiting
        let guard = self.gate.clone().lock_owned().await;
        let task = tokio::task::spawn_blocking(move || (build(), guard));

        let joined = match self.build_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Build exceeded {:?}; keeping the previous graph", limit);
                    return Err(RebuildError::Timeout(limit));
                }
            },
            None => task.await,
        };
        let (result, _guard) = joined?;
        let output = result?;
        let stats = output.stats;

        let payload = GraphUpdatePayload::snapshot(&output);
        *self.graph.write().await = output;
        info!(
            "Published graph: {} nodes, {} edges",
            payload.node_count, payload.edge_count
        );
        self.broadcast(BroadcastMessage::GraphUpdate(payload));

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::{CallRef, FileSummary, FunctionDecl, ProjectSummary};

    fn parsed(files: Vec<FileSummary>) -> ParsedSummary {
        ParsedSummary {
            summary: ProjectSummary { files },
            rejected: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_rebuild_replaces_and_broadcasts() {
        let handle = ServerHandle::new(BuildOutput::default(), None);
        let mut rx = handle.subscribe();

        let stats = handle
            .rebuild(parsed(vec![FileSummary::new("a.py")
                .with_function(FunctionDecl::new("f").with_call(CallRef::local("g")))
                .with_function(FunctionDecl::new("g"))]))
            .await
            .unwrap();
        assert_eq!(stats.calls_resolved, 1);

        assert_eq!(handle.graph().read().await.graph.node_count(), 3);
        match rx.recv().await.unwrap() {
            BroadcastMessage::GraphUpdate(update) => {
                assert_eq!(update.node_count, 3);
                assert_eq!(update.edge_count, 1);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_graph() {
        let handle = ServerHandle::new(BuildOutput::default(), Some(Duration::from_millis(100)));
        handle
            .rebuild(parsed(vec![FileSummary::new("a.py")]))
            .await
            .unwrap();

        let result = handle
            .run_build(|| {
                std::thread::sleep(Duration::from_millis(600));
                Ok(BuildOutput::default())
            })
            .await;
        assert!(matches!(result, Err(RebuildError::Timeout(_))));
        assert_eq!(handle.graph().read().await.graph.node_count(), 1);

        // the next build waits for the abandoned one to release the gate
        handle
            .rebuild(parsed(vec![FileSummary::new("a.py"), FileSummary::new("b.py")]))
            .await
            .unwrap();
        assert_eq!(handle.graph().read().await.graph.node_count(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SummaryCache::new(dir.path());
        cache
            .store(&FileSummary::new("b.py").with_function(FunctionDecl::new("helper")))
            .unwrap();

        let handle = ServerHandle::new(BuildOutput::default(), None);
        let stats = handle.rebuild_from_cache(cache).await.unwrap();
        assert_eq!(stats.files, 1);
        assert!(handle.graph().read().await.graph.contains("b.py::helper"));
    }
}
