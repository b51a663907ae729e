//! Snapshot store: captured arguments keyed by freshly minted identifiers
//!
//! Values are deep-copied when committed and again on every retrieval, so a
//! body that mutates its inputs can be replayed any number of times.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rebugger_lang::{MethodDef, MethodId, Value};
use tracing::debug;
use uuid::Uuid;

use crate::copy::{DeepCopy, StructuralCopy};
use crate::error::{CaptureError, CaptureResult};

/// Arguments bound by one invocation of a method
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: Uuid,
    pub method: MethodId,
    pub function: String,
    pub module: String,
    /// Call depth of the captured invocation
    pub depth: usize,
    /// Parameter names: positional, then keyword, then type parameters
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl Snapshot {
    /// `(name, value)` pairs in capture order
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(&self.values)
    }
}

/// Store shared between a session and the natives it installs
pub type SharedStore = Rc<RefCell<SnapshotStore>>;

/// Keyed map of snapshots
pub struct SnapshotStore {
    snapshots: HashMap<Uuid, Snapshot>,
    /// Commit order, oldest first
    order: Vec<Uuid>,
    copier: Box<dyn DeepCopy>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").field("snapshots", &self.order.len()).finish()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_copier(StructuralCopy::new())
    }

    pub fn with_copier(copier: impl DeepCopy + 'static) -> Self {
        Self { snapshots: HashMap::new(), order: Vec::new(), copier: Box::new(copier) }
    }

    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Replace the copy strategy used from now on
    pub fn set_copier(&mut self, copier: impl DeepCopy + 'static) {
        self.copier = Box::new(copier);
    }

    /// Record a copy of `values` and return the new identifier
    pub fn commit(&mut self, method: &MethodDef, depth: usize, names: Vec<String>, values: &[Value]) -> Uuid {
        let id = Uuid::new_v4();
        let snapshot = Snapshot {
            id,
            method: method.id,
            function: method.name.clone(),
            module: method.module.clone(),
            depth,
            names,
            values: self.copier.deep_copy_all(values),
        };
        debug!(%id, method = %method.id, function = %method.name, depth, "committed snapshot");
        self.snapshots.insert(id, snapshot);
        self.order.push(id);
        id
    }

    /// Fresh copies of the stored values
    pub fn get(&self, id: Uuid) -> CaptureResult<Vec<Value>> {
        let snapshot = self.snapshot(id)?;
        Ok(self.copier.deep_copy_all(&snapshot.values))
    }

    /// Stored metadata; values are not copied
    pub fn snapshot(&self, id: Uuid) -> CaptureResult<&Snapshot> {
        self.snapshots.get(&id).ok_or(CaptureError::UnknownIdentifier(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.snapshots.contains_key(&id)
    }

    /// Marker for [`Self::committed_since`]
    pub fn mark(&self) -> usize {
        self.order.len()
    }

    /// Snapshots committed after `mark`, oldest first
    pub fn committed_since(&self, mark: usize) -> impl Iterator<Item = &Snapshot> {
        self.order.iter().skip(mark).filter_map(|id| self.snapshots.get(id))
    }

    /// Drop every snapshot; all outstanding identifiers become unknown
    pub fn clear(&mut self) {
        debug!(count = self.order.len(), "clearing snapshot store");
        self.snapshots.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebugger_lang::{parse_program, ExprKind, Origin};

    fn method() -> MethodDef {
        let expr = parse_program("function f(x)\n    x\nend").unwrap().remove(0);
        let ExprKind::Function(def) = expr.kind else { panic!("expected function") };
        MethodDef { id: MethodId(7), module: "Main".into(), name: "f".into(), def, origin: Origin::Repl }
    }

    #[test]
    fn test_retrieval_is_copy_safe() {
        let mut store = SnapshotStore::new();
        let arg = Value::array(vec![Value::Int(1)]);
        let id = store.commit(&method(), 1, vec!["x".into()], &[arg.clone()]);

        // Mutating the live argument does not reach the store
        if let Value::Array(items) = &arg {
            items.borrow_mut().push(Value::Int(99));
        }
        let first = store.get(id).unwrap();
        if let Value::Array(items) = &first[0] {
            items.borrow_mut().clear();
        }
        let second = store.get(id).unwrap();
        assert_eq!(second[0].to_string(), "[1]");
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut store = SnapshotStore::new();
        let a = store.commit(&method(), 1, vec![], &[]);
        let b = store.commit(&method(), 1, vec![], &[]);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        let since: Vec<_> = store.committed_since(1).map(|s| s.id).collect();
        assert_eq!(since, vec![b]);
    }

    #[test]
    fn test_clear_invalidates_identifiers() {
        let mut store = SnapshotStore::new();
        let id = store.commit(&method(), 1, vec!["x".into()], &[Value::Int(1)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get(id).unwrap_err(), CaptureError::UnknownIdentifier(id));
    }

    #[test]
    fn test_snapshot_metadata() {
        let mut store = SnapshotStore::new();
        let id = store.commit(&method(), 3, vec!["x".into()], &[Value::Int(5)]);
        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(snapshot.method, MethodId(7));
        assert_eq!(snapshot.depth, 3);
        let bindings: Vec<_> = snapshot.bindings().map(|(n, v)| (n.to_string(), v.clone())).collect();
        assert_eq!(bindings, vec![("x".to_string(), Value::Int(5))]);
    }
}
