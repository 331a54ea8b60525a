use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use super::ContextKey;
use crate::error::MapTreeError;

type Cleanup = Box<dyn FnOnce() -> Result<(), MapTreeError> + Send>;

/// A node of the component tree.
///
/// A scope owns its child scopes and the cleanup callbacks registered by the component mounted
/// into it. Unmounting a scope first unmounts its children (the last mounted child goes first),
/// then runs its own cleanups in reverse order of registration. This guarantees that a layer is
/// removed before its source, and a source before the map that holds it.
///
/// `Scope` is a cheap handle: clones refer to the same node.
#[derive(Clone)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

struct ScopeNode {
    parent: Option<Arc<ScopeNode>>,
    state: Mutex<ScopeState>,
}

struct ScopeState {
    mounted: bool,
    contexts: AHashMap<ContextKey, Arc<dyn Any + Send + Sync>>,
    children: Vec<Arc<ScopeNode>>,
    cleanups: Vec<Cleanup>,
}

impl ScopeNode {
    fn new(parent: Option<Arc<ScopeNode>>) -> Arc<Self> {
        Arc::new(Self {
            parent,
            state: Mutex::new(ScopeState {
                mounted: true,
                contexts: AHashMap::new(),
                children: Vec::new(),
                cleanups: Vec::new(),
            }),
        })
    }

    fn unmount(self: &Arc<Self>) -> Vec<MapTreeError> {
        let (children, cleanups) = {
            let mut state = self.state.lock();
            if !state.mounted {
                return vec![];
            }

            state.mounted = false;
            (
                std::mem::take(&mut state.children),
                std::mem::take(&mut state.cleanups),
            )
        };

        let mut errors = vec![];
        for child in children.into_iter().rev() {
            errors.extend(child.unmount());
        }

        for cleanup in cleanups.into_iter().rev() {
            if let Err(err) = cleanup() {
                errors.push(err);
            }
        }

        self.state.lock().contexts.clear();

        if let Some(parent) = &self.parent {
            parent
                .state
                .lock()
                .children
                .retain(|child| !Arc::ptr_eq(child, self));
        }

        errors
    }
}

impl Scope {
    /// Creates a new root scope.
    ///
    /// A root created this way lives until [`Scope::unmount`] is called. Use [`Tree`] to unmount
    /// it automatically.
    pub fn root() -> Self {
        Self {
            node: ScopeNode::new(None),
        }
    }

    /// Creates a child scope.
    ///
    /// Fails with [`MapTreeError::Unmounted`] if this scope was already unmounted.
    pub fn child(&self) -> Result<Scope, MapTreeError> {
        let mut state = self.node.state.lock();
        if !state.mounted {
            return Err(MapTreeError::Unmounted);
        }

        let child = ScopeNode::new(Some(self.node.clone()));
        state.children.push(child.clone());

        Ok(Scope { node: child })
    }

    /// Returns true if the scope has not been unmounted yet.
    pub fn is_mounted(&self) -> bool {
        self.node.state.lock().mounted
    }

    /// Number of currently mounted child scopes.
    pub fn child_count(&self) -> usize {
        self.node.state.lock().children.len()
    }

    /// Publishes `value` under `key` for this scope and all its descendants.
    ///
    /// A value published under the same key in a nested scope shadows this one for the
    /// descendants of that scope.
    pub fn provide<T: Any + Send + Sync>(&self, key: &ContextKey, value: T) {
        self.node.state.lock().contexts.insert(*key, Arc::new(value));
    }

    /// Finds the value published under `key` by this scope or the nearest ancestor.
    ///
    /// Values of a type other than `T` are skipped.
    pub fn lookup<T: Any + Send + Sync>(&self, key: &ContextKey) -> Option<Arc<T>> {
        let mut node = Some(&self.node);
        while let Some(current) = node {
            let value = current.state.lock().contexts.get(key).cloned();
            if let Some(value) = value.and_then(|v| v.downcast::<T>().ok()) {
                return Some(value);
            }

            node = current.parent.as_ref();
        }

        None
    }

    /// Registers a callback to be run when the scope is unmounted.
    ///
    /// If the scope is already unmounted, the callback is run immediately.
    pub fn on_unmount(
        &self,
        cleanup: impl FnOnce() -> Result<(), MapTreeError> + Send + 'static,
    ) -> Result<(), MapTreeError> {
        {
            let mut state = self.node.state.lock();
            if state.mounted {
                state.cleanups.push(Box::new(cleanup));
                return Ok(());
            }
        }

        cleanup()
    }

    /// Unmounts the scope and all of its descendants.
    ///
    /// All cleanups are run even if some of them fail; the failures are returned together.
    /// Calling this method on an already unmounted scope does nothing.
    pub fn unmount(&self) -> Result<(), MapTreeError> {
        MapTreeError::collect(self.node.unmount())
    }

    /// Returns true if both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.node.state.lock();
        f.debug_struct("Scope")
            .field("mounted", &state.mounted)
            .field("children", &state.children.len())
            .field("contexts", &state.contexts.keys().map(|k| k.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Owner of a root [`Scope`]. Unmounts the whole tree when dropped.
///
/// ```
/// use maptree::context::Tree;
///
/// let tree = Tree::new();
/// let scope = tree.scope().child()?;
/// drop(tree);
///
/// assert!(!scope.is_mounted());
/// # Ok::<(), maptree::error::MapTreeError>(())
/// ```
pub struct Tree {
    root: Scope,
}

impl Tree {
    /// Creates a new tree with an empty root scope.
    pub fn new() -> Self {
        Self {
            root: Scope::root(),
        }
    }

    /// Root scope of the tree.
    pub fn scope(&self) -> &Scope {
        &self.root
    }

    /// Unmounts the tree, returning teardown failures instead of logging them.
    pub fn close(self) -> Result<(), MapTreeError> {
        self.root.unmount()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        if let Err(err) = self.root.unmount() {
            log::error!("Failed to tear down map tree: {err}");
        }
    }
}
