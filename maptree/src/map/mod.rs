//! [`MapProvider`] owns a map engine and publishes a [`MapContext`] to its descendants.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::{Mutex, RwLock};

use crate::context::{Scope, MAP_KEY};
use crate::engine::{EngineFactory, MapEngine};
use crate::error::MapTreeError;

mod loaded;
mod options;

pub use loaded::{LoadedSignal, ReadyNotifier, SubscriptionId};
pub use options::{MapOptions, MapStyle};

/// Shared handle to a map engine instance.
///
/// All clones refer to the same engine. After the owning [`MapProvider`] is unmounted the engine
/// is destroyed and every access through the handle fails with [`MapTreeError::MapDestroyed`].
#[derive(Clone)]
pub struct MapHandle {
    engine: Arc<RwLock<Option<Box<dyn MapEngine>>>>,
}

impl MapHandle {
    fn new(engine: Box<dyn MapEngine>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(Some(engine))),
        }
    }

    /// Runs `f` with a shared reference to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&dyn MapEngine) -> R) -> Result<R, MapTreeError> {
        let engine = self.engine.read();
        match engine.as_deref() {
            Some(engine) => Ok(f(engine)),
            None => Err(MapTreeError::MapDestroyed),
        }
    }

    /// Runs `f` with an exclusive reference to the engine.
    pub fn with_engine_mut<R>(
        &self,
        f: impl FnOnce(&mut dyn MapEngine) -> R,
    ) -> Result<R, MapTreeError> {
        let mut engine = self.engine.write();
        match engine.as_deref_mut() {
            Some(engine) => Ok(f(engine)),
            None => Err(MapTreeError::MapDestroyed),
        }
    }

    /// Returns true if the engine was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.engine.read().is_none()
    }

    /// Returns true if both handles refer to the same engine.
    pub fn ptr_eq(&self, other: &MapHandle) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }

    pub(crate) fn destroy(&self) {
        if let Some(mut engine) = self.engine.write().take() {
            engine.destroy();
        }
    }
}

impl std::fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHandle")
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Source and layer ids claimed by components of one map.
///
/// Ids are claimed when a component is mounted, before the engine knows about them, so that
/// collisions are reported to the caller right away instead of when the map finishes loading.
#[derive(Debug, Default)]
pub(crate) struct IdRegistry {
    sources: AHashSet<String>,
    layers: AHashMap<String, String>,
}

impl IdRegistry {
    pub(crate) fn claim_source(&mut self, id: &str) -> Result<(), MapTreeError> {
        if !self.sources.insert(id.to_string()) {
            return Err(MapTreeError::DuplicateSource(id.to_string()));
        }

        Ok(())
    }

    pub(crate) fn release_source(&mut self, id: &str) {
        self.sources.remove(id);
    }

    pub(crate) fn layer_owner(&self, layer_id: &str) -> Option<&str> {
        self.layers.get(layer_id).map(String::as_str)
    }

    pub(crate) fn claim_layer(&mut self, layer_id: &str, source_id: &str) {
        self.layers
            .insert(layer_id.to_string(), source_id.to_string());
    }

    pub(crate) fn release_layer(&mut self, layer_id: &str) {
        self.layers.remove(layer_id);
    }
}

/// Capability published by a [`MapProvider`] to its descendants.
#[derive(Debug, Clone)]
pub struct MapContext {
    map: MapHandle,
    loaded: LoadedSignal,
    registry: Arc<Mutex<IdRegistry>>,
}

impl MapContext {
    /// Handle to the engine. The same handle is returned for the whole life of the provider.
    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    /// Signal that fires once the engine has loaded.
    pub fn loaded(&self) -> &LoadedSignal {
        &self.loaded
    }

    /// Finds the map context of the nearest enclosing [`MapProvider`].
    pub fn lookup(scope: &Scope) -> Option<Arc<MapContext>> {
        scope.lookup::<MapContext>(&MAP_KEY)
    }

    pub(crate) fn registry(&self) -> &Mutex<IdRegistry> {
        &self.registry
    }
}

/// Component that creates a map engine and makes it available to the components mounted into
/// its [scope](MapProvider::scope).
///
/// ```
/// use maptree::context::Tree;
/// use maptree::engine::HeadlessEngineFactory;
/// use maptree::layer::{LayerConsumer, LayerSpec, LayerType};
/// use maptree::map::{MapOptions, MapProvider};
/// use maptree::source::{SourceProvider, SourceSpec};
///
/// let tree = Tree::new();
/// let map = MapProvider::mount(
///     tree.scope(),
///     &HeadlessEngineFactory::default(),
///     MapOptions::new("map", "https://example.com/style.json"),
/// )?;
/// let source = SourceProvider::mount(
///     map.scope(),
///     SourceSpec::vector_url("https://example.com/tiles.json").with_id("roads"),
/// )?;
/// LayerConsumer::mount(source.scope(), LayerSpec::new(LayerType::Line).with_source_layer("road"))?;
///
/// map.notify_loaded()?;
/// # Ok::<(), maptree::error::MapTreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MapProvider {
    scope: Scope,
    context: MapContext,
}

impl MapProvider {
    /// Creates the engine and mounts the provider as a child of `parent`.
    ///
    /// Errors of the engine construction are returned as is; nothing is mounted in that case.
    pub fn mount(
        parent: &Scope,
        factory: &dyn EngineFactory,
        options: MapOptions,
    ) -> Result<Self, MapTreeError> {
        let loaded = LoadedSignal::new();
        let engine = factory.create(&options, ReadyNotifier::new(loaded.clone()))?;
        let map = MapHandle::new(engine);

        let scope = match parent.child() {
            Ok(scope) => scope,
            Err(err) => {
                map.destroy();
                return Err(err);
            }
        };

        let context = MapContext {
            map,
            loaded,
            registry: Arc::new(Mutex::new(IdRegistry::default())),
        };
        scope.provide(&MAP_KEY, context.clone());

        let teardown = context.clone();
        scope.on_unmount(move || {
            teardown.loaded.close();
            teardown.map.destroy();
            *teardown.registry.lock() = IdRegistry::default();
            log::info!("Map engine destroyed");
            Ok(())
        })?;

        log::info!("Map engine created in container `{}`", options.container);

        Ok(Self { scope, context })
    }

    /// Scope to mount sources and other map dependent components into.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Context published by the provider.
    pub fn context(&self) -> &MapContext {
        &self.context
    }

    /// Handle to the engine.
    pub fn map(&self) -> &MapHandle {
        &self.context.map
    }

    /// Returns true once the engine has loaded.
    pub fn is_loaded(&self) -> bool {
        self.context.loaded.is_loaded()
    }

    /// Reports that the engine has finished loading, which registers all sources and layers mounted
    /// so far.
    ///
    /// Failures of those registrations are returned together; every registration is attempted.
    pub fn notify_loaded(&self) -> Result<(), MapTreeError> {
        self.context.loaded.fire()
    }

    /// Unmounts all components of the map and destroys the engine.
    pub fn unmount(&self) -> Result<(), MapTreeError> {
        self.scope.unmount()
    }
}
