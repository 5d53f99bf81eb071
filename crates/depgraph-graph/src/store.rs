use crate::builder::BuildOutput;
use sled::Db;
use std::path::Path;
use thiserror::Error;

const SNAPSHOT_KEY: &str = "snapshot";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Persists the last completed build between runs.
pub struct GraphStore {
    db: Db,
}

impl GraphStore {
    /// Opens or creates a graph store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Saves a build (graph, diagnostics and stats) as one bincode blob.
    pub fn save_snapshot(&self, output: &BuildOutput) -> Result<(), StoreError> {
        let bytes = bincode::serialize(output)?;
        self.db.insert(SNAPSHOT_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the saved build, if there is one.
    pub fn load_snapshot(&self) -> Result<Option<BuildOutput>, StoreError> {
        match self.db.get(SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Clears the stored snapshot.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.remove(SNAPSHOT_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use crate::edge::EdgeKind;
    use depgraph_core::{CallRef, FileSummary, FunctionDecl, Parameter, ProjectSummary};
    use tempfile::tempdir;

    #[test]
    fn test_save_load_snapshot() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path()).unwrap();
        assert!(store.load_snapshot().unwrap().is_none());

        let summary = ProjectSummary {
            files: vec![FileSummary::new("a.py")
                .with_function(
                    FunctionDecl::new("f")
                        .with_parameter(Parameter::typed("x", "int"))
                        .with_call(CallRef::local("g"))
                        .with_call(CallRef::local("missing")),
                )
                .with_function(FunctionDecl::new("g"))],
        };
        let output = build_graph(&summary);
        store.save_snapshot(&output).unwrap();

        let loaded = store.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded.graph.node_count(), 3);
        assert_eq!(loaded.graph.edge_count_of(EdgeKind::Call), 1);
        assert_eq!(loaded.diagnostics, output.diagnostics);
        assert_eq!(loaded.stats, output.stats);

        // indexes are rebuilt on load
        let f = loaded.graph.get_by_id("a.py::f").unwrap();
        assert_eq!(f.signature().unwrap().to_string(), "(x: int)");
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path()).unwrap();
        store.save_snapshot(&BuildOutput::default()).unwrap();
        store.clear().unwrap();
        assert!(store.load_snapshot().unwrap().is_none());
    }
}
