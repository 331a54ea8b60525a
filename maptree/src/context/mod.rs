//! Scoped contexts shared between components of a map tree.
//!
//! Every component is mounted into a [`Scope`]. Providers publish a capability object under a
//! [`ContextKey`] in their own scope, and descendants look it up by walking towards the root,
//! so a layer can reach its source and map without holding references to them.

use std::sync::atomic::{AtomicU64, Ordering};

use lazy_static::lazy_static;

mod scope;

pub use scope::{Scope, Tree};

lazy_static! {
    /// Key of the [`MapContext`](crate::MapContext) published by a [`MapProvider`](crate::MapProvider).
    pub static ref MAP_KEY: ContextKey = ContextKey::new("map");
    /// Key of the [`SourceContext`](crate::SourceContext) published by a
    /// [`SourceProvider`](crate::SourceProvider).
    pub static ref SOURCE_KEY: ContextKey = ContextKey::new("source");
}

/// Opaque token identifying a kind of context.
///
/// Keys are compared by identity: two keys created by separate calls to [`ContextKey::new`] never
/// match, even if they have the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey {
    id: u64,
    name: &'static str,
}

impl ContextKey {
    /// Allocates a new unique key. The name is only used for debugging.
    pub fn new(name: &'static str) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    /// Name given to the key on creation.
    pub fn name(&self) -> &'static str {
        self.name
    }
}
