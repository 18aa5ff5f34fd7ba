//
// dom.rs
//
// Minimal element tree and document-level click listeners
//

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Handle to an element of a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Parent-linked element tree. Node 0 is the document root.
#[derive(Debug, Clone)]
pub struct NodeTree {
    parents: Vec<Option<NodeId>>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self {
            parents: vec![None],
        }
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new element under `parent` and return its handle
    pub fn append_child(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.parents.len());
        self.parents.push(Some(parent));
        id
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(node.0).copied().flatten()
    }

    /// Whether walking up from `target` reaches `container` (inclusive)
    pub fn is_within(&self, target: NodeId, container: NodeId) -> bool {
        let mut current = Some(target);
        while let Some(node) = current {
            if node == container {
                return true;
            }
            current = self.parent(node);
        }
        false
    }
}

/// Registration handle returned by [`Document::add_click_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ClickListener = Arc<dyn Fn(&NodeTree, NodeId) + Send + Sync>;

/// Shared document-level event target.
///
/// Holds the element tree and every registered click listener. Listeners are
/// invoked outside the registry lock, so a listener may add or remove
/// listeners while it runs.
pub struct Document {
    tree: NodeTree,
    listeners: DashMap<ListenerId, ClickListener>,
    next_id: AtomicU64,
}

impl Document {
    pub fn new(tree: NodeTree) -> Self {
        Self {
            tree,
            listeners: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn add_click_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NodeTree, NodeId) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_click_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a click on `target` to every registered listener
    pub fn dispatch_click(&self, target: NodeId) {
        let listeners: Vec<ClickListener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in listeners {
            listener(&self.tree, target);
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.parents.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Outside-click listener bound to a component root.
///
/// Registered on construction and removed exactly once when dropped.
/// `on_outside` runs for every click whose target is not inside `root`.
pub struct OutsideClickGuard {
    document: Arc<Document>,
    id: ListenerId,
}

impl OutsideClickGuard {
    pub fn attach<F>(document: Arc<Document>, root: NodeId, on_outside: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = document.add_click_listener(move |tree, target| {
            if !tree.is_within(target, root) {
                on_outside();
            }
        });
        log::trace!("Attached outside-click listener {:?} for root {:?}", id, root);
        Self { document, id }
    }
}

impl Drop for OutsideClickGuard {
    fn drop(&mut self) {
        if self.document.remove_click_listener(self.id) {
            log::trace!("Detached outside-click listener {:?}", self.id);
        }
    }
}
