//! Request handlers for protocol methods.
//!
//! Each handler implements one JSON-RPC method.

use crate::handle::{BroadcastMessage, RebuildError, ServerHandle};
use crate::protocol::{NodeParams, RebuildParams, Response, BUILD_FAILED, NODE_NOT_FOUND};
use depgraph_core::ProjectSummary;
use depgraph_graph::{EdgeKind, GraphError, GraphStats, NodeKind};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Handles the graph.info method.
pub async fn handle_info(handle: &ServerHandle, id: Option<Value>) -> Response {
    let shared = handle.graph();
    let g = shared.read().await;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct InfoResult {
        node_count: usize,
        edge_count: usize,
        file_count: usize,
        callables: usize,
        call_edges: usize,
        usage_edges: usize,
        diagnostic_count: usize,
        version: &'static str,
    }

    let GraphStats {
        node_count,
        edge_count,
        files,
        callables,
        call_edges,
        usage_edges,
    } = g.graph.stats();

    Response::success(
        id,
        InfoResult {
            node_count,
            edge_count,
            file_count: files,
            callables,
            call_edges,
            usage_edges,
            diagnostic_count: g.diagnostics.len(),
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Handles the graph.nodes method.
pub async fn handle_nodes(handle: &ServerHandle, id: Option<Value>) -> Response {
    let shared = handle.graph();
    let g = shared.read().await;
    let nodes: Vec<_> = g.graph.nodes().collect();
    Response::success(id, nodes)
}

/// Handles the graph.edges method.
pub async fn handle_edges(handle: &ServerHandle, id: Option<Value>) -> Response {
    let shared = handle.graph();
    let g = shared.read().await;
    Response::success(id, g.graph.export_edges())
}

/// Handles the graph.diagnostics method.
pub async fn handle_diagnostics(handle: &ServerHandle, id: Option<Value>) -> Response {
    let shared = handle.graph();
    let g = shared.read().await;
    Response::success(id, &g.diagnostics)
}

/// Handles the node.get method.
///
/// A file node also lists every symbol it declares.
pub async fn handle_node_get(handle: &ServerHandle, id: Option<Value>, params: NodeParams) -> Response {
    let shared = handle.graph();
    let g = shared.read().await;

    let Some(idx) = g.graph.get_index(&params.id) else {
        return Response::error(id, NODE_NOT_FOUND, format!("Node not found: {}", params.id));
    };
    let Some(node) = g.graph.get(idx) else {
        return Response::error(id, NODE_NOT_FOUND, format!("Node not found: {}", params.id));
    };

    let ids = |nodes: Vec<&depgraph_graph::Node>| -> Vec<String> {
        nodes.into_iter().map(|n| n.id.clone()).collect()
    };

    let declares: Vec<String> = if node.kind == NodeKind::File {
        g.graph
            .find_by_file(&node.id)
            .into_iter()
            .filter(|n| n.id != node.id)
            .map(|n| n.id.clone())
            .collect()
    } else {
        Vec::new()
    };

    Response::success(
        id,
        serde_json::json!({
            "node": node,
            "declares": declares,
            "edges": {
                "contains": ids(g.graph.targets_of(idx, EdgeKind::Containment)),
                "calledBy": ids(g.graph.get_callers(idx)),
                "calls": ids(g.graph.get_callees(idx)),
                "uses": ids(g.graph.targets_of(idx, EdgeKind::ImportUsage)),
            }
        }),
    )
}

/// Handles the node.select method.
///
/// A non-file node is broadcast as `NodeSelected`; a file selects to `null`.
pub async fn handle_node_select(
    handle: &ServerHandle,
    id: Option<Value>,
    params: NodeParams,
) -> Response {
    let selected = {
        let shared = handle.graph();
        let g = shared.read().await;
        g.graph.select(&params.id)
    };

    match selected {
        Ok(Some(detail)) => {
            debug!("Selected {}", detail.id);
            handle.broadcast(BroadcastMessage::NodeSelected(detail.clone()));
            Response::success(id, detail)
        }
        Ok(None) => Response::success(id, Value::Null),
        Err(GraphError::NodeNotFound(node)) => {
            Response::error(id, NODE_NOT_FOUND, format!("Node not found: {}", node))
        }
    }
}

/// Handles the graph.rebuild method.
pub async fn handle_rebuild(
    handle: &ServerHandle,
    id: Option<Value>,
    params: RebuildParams,
) -> Response {
    let parsed = ProjectSummary::from_values(params.files);
    debug!(
        "Rebuild requested: {} files, {} rejected",
        parsed.summary.files.len(),
        parsed.rejected.len()
    );

    match handle.rebuild(parsed).await {
        Ok(stats) => Response::success(id, stats),
        Err(e @ RebuildError::Timeout(_)) => Response::error(id, BUILD_FAILED, e.to_string()),
        Err(e) => Response::error(id, BUILD_FAILED, format!("Build failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::{ClassDecl, FileSummary, FunctionDecl};
    use depgraph_graph::build_graph;
    use serde_json::json;

    fn handle() -> ServerHandle {
        let summary = ProjectSummary {
            files: vec![FileSummary::new("a.py")
                .with_class(ClassDecl::new("K").with_method(FunctionDecl::new("m")))
                .with_function(FunctionDecl::new("f").with_return_type("int"))],
        };
        ServerHandle::new(build_graph(&summary), None)
    }

    fn result(response: Response) -> Value {
        assert!(response.error.is_none(), "{:?}", response.error);
        response.result.unwrap()
    }

    #[tokio::test]
    async fn test_info() {
        let value = result(handle_info(&handle(), Some(json!(1))).await);
        assert_eq!(value["nodeCount"], 4);
        assert_eq!(value["edgeCount"], 1);
        assert_eq!(value["callables"], 2);
        assert_eq!(value["diagnosticCount"], 0);
    }

    #[tokio::test]
    async fn test_node_get_file_lists_declarations() {
        let h = handle();
        let value = result(handle_node_get(&h, None, NodeParams { id: "a.py".into() }).await);
        assert_eq!(value["node"]["kind"], "file");
        assert_eq!(value["declares"], json!(["a.py::K", "a.py::K.m", "a.py::f"]));
    }

    #[tokio::test]
    async fn test_node_get() {
        let h = handle();
        let value = result(
            handle_node_get(&h, None, NodeParams { id: "a.py::K".into() }).await,
        );
        assert_eq!(value["node"]["kind"], "class");
        assert_eq!(value["edges"]["contains"], json!(["a.py::K.m"]));

        assert_eq!(value["declares"], json!([]));

        let missing = handle_node_get(&h, None, NodeParams { id: "zzz".into() }).await;
        assert_eq!(missing.error.unwrap().code, NODE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_select_broadcasts() {
        let h = handle();
        let mut rx = h.subscribe();

        let value = result(
            handle_node_select(&h, None, NodeParams { id: "a.py::f".into() }).await,
        );
        assert_eq!(value["kind"], "function");
        match rx.try_recv().unwrap() {
            BroadcastMessage::NodeSelected(detail) => assert_eq!(detail.id, "a.py::f"),
            other => panic!("unexpected message {:?}", other),
        }

        // files select to null and broadcast nothing
        let value = result(handle_node_select(&h, None, NodeParams { id: "a.py".into() }).await);
        assert!(value.is_null());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rebuild() {
        let h = handle();
        let params = RebuildParams {
            files: vec![
                json!({"file_name": "b.py", "functions": [{"name": "g"}]}),
                json!({"file_name": "c.py", "classes": 3}),
            ],
        };
        let value = result(handle_rebuild(&h, None, params).await);
        assert_eq!(value["files"], 1);
        assert_eq!(value["rejected_files"], 1);

        let shared = h.graph();
        let g = shared.read().await;
        assert!(g.graph.contains("b.py::g"));
        assert!(!g.graph.contains("a.py"));
    }
}
