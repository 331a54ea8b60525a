//! [`LayerConsumer`] draws the data of the enclosing source on the map.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::context::Scope;
use crate::engine::MapEngine;
use crate::error::MapTreeError;
use crate::map::{MapContext, SubscriptionId};
use crate::registration::{unique_id, RegistrationState};
use crate::source::SourceContext;

mod properties;
mod spec;

pub use properties::{omit_unset, Properties};
pub use spec::{LayerDefinition, LayerSpec, LayerType};

struct LayerShared {
    id: String,
    source: SourceContext,
    map: MapContext,
    spec: Mutex<LayerSpec>,
    state: Mutex<RegistrationState>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LayerShared {
    fn register(&self) -> Result<(), MapTreeError> {
        let spec = self.spec.lock();
        let mut state = self.state.lock();
        if *state != RegistrationState::Unregistered {
            return Ok(());
        }

        let definition = spec.definition(&self.id, self.source.source_id());
        self.map
            .map()
            .with_engine_mut(|engine| engine.add_layer(&definition))??;
        *state = RegistrationState::Registered;

        log::debug!(
            "Layer `{}` added to the map on source `{}`",
            self.id,
            definition.source
        );
        Ok(())
    }

    fn teardown(&self) -> Result<(), MapTreeError> {
        if let Some(subscription) = self.subscription.lock().take() {
            self.map.loaded().unsubscribe(subscription);
        }

        let previous = std::mem::replace(&mut *self.state.lock(), RegistrationState::Disposed);
        self.source.remove_child_layer(&self.id);

        if previous != RegistrationState::Registered {
            return Ok(());
        }

        let result = self.map.map().with_engine_mut(|engine| {
            if engine.has_layer(&self.id) {
                engine.remove_layer(&self.id)
            } else {
                Ok(())
            }
        });

        match result {
            Ok(result) => {
                log::debug!("Layer `{}` removed from the map", self.id);
                result
            }
            // The engine was destroyed before this layer unmounted.
            Err(MapTreeError::MapDestroyed) => {
                log::warn!("Layer `{}` outlived its map, nothing to remove", self.id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Applies a change to the engine if the layer is registered, then stores it in the spec.
    fn update(
        &self,
        apply: impl FnOnce(&mut dyn MapEngine) -> Result<(), MapTreeError>,
        store: impl FnOnce(&mut LayerSpec),
    ) -> Result<(), MapTreeError> {
        let mut spec = self.spec.lock();
        match *self.state.lock() {
            RegistrationState::Disposed => return Err(MapTreeError::Unmounted),
            RegistrationState::Registered => self.map.map().with_engine_mut(apply)??,
            RegistrationState::Unregistered => {}
        }

        store(&mut spec);
        Ok(())
    }
}

/// Component that adds a layer drawing the data of the nearest enclosing
/// [`SourceProvider`](crate::SourceProvider).
///
/// The layer is added to the engine once the map has loaded, and removed when the consumer is
/// unmounted. Removal after the map was destroyed does nothing.
#[derive(Clone)]
pub struct LayerConsumer {
    scope: Scope,
    shared: Arc<LayerShared>,
}

impl LayerConsumer {
    /// Mounts the layer as a child of `parent`.
    ///
    /// Fails before touching the engine if `parent` is not inside a source provider, if the
    /// configuration is invalid, or if the layer id is already used on the map. If the map is
    /// already loaded, the layer is added right away and errors of the engine are returned.
    pub fn mount(parent: &Scope, spec: LayerSpec) -> Result<Self, MapTreeError> {
        let source = SourceContext::lookup(parent).ok_or(MapTreeError::MissingContext {
            component: "LayerConsumer",
            provider: "SourceProvider",
        })?;
        let map = MapContext::lookup(parent).ok_or(MapTreeError::MissingContext {
            component: "LayerConsumer",
            provider: "MapProvider",
        })?;

        if !map.map().ptr_eq(source.map().map()) {
            return Err(MapTreeError::Configuration(format!(
                "source `{}` belongs to a different map than the enclosing map provider",
                source.source_id()
            )));
        }

        spec.validate()?;
        let id = spec.id.clone().unwrap_or_else(|| unique_id("layer"));

        let claimed = map.registry().lock().layer_owner(&id).is_some();
        let exists_in_engine = map.loaded().is_loaded()
            && map
                .map()
                .with_engine(|engine| engine.has_layer(&id))
                .unwrap_or(false);
        if claimed || exists_in_engine {
            return Err(MapTreeError::DuplicateLayer(id));
        }

        source.add_child_layer(&id)?;

        let scope = match parent.child() {
            Ok(scope) => scope,
            Err(err) => {
                source.remove_child_layer(&id);
                return Err(err);
            }
        };

        let shared = Arc::new(LayerShared {
            id,
            source: (*source).clone(),
            map: (*map).clone(),
            spec: Mutex::new(spec),
            state: Mutex::new(RegistrationState::Unregistered),
            subscription: Mutex::new(None),
        });

        let teardown = shared.clone();
        scope.on_unmount(move || teardown.teardown())?;

        let registration = shared.clone();
        match map.loaded().subscribe(move || registration.register()) {
            Ok(subscription) => *shared.subscription.lock() = subscription,
            Err(err) => {
                if let Err(teardown_err) = scope.unmount() {
                    log::warn!("Failed to unmount layer `{}`: {teardown_err}", shared.id);
                }
                return Err(err);
            }
        }

        Ok(Self { scope, shared })
    }

    /// Id of the layer.
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Id of the source the layer draws.
    pub fn source_id(&self) -> &str {
        self.shared.source.source_id()
    }

    /// Scope of the layer.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        *self.shared.state.lock()
    }

    /// Current configuration of the layer.
    pub fn spec(&self) -> LayerSpec {
        self.shared.spec.lock().clone()
    }

    /// Sets (`Some`) or unsets (`None`) a paint property.
    pub fn set_paint_property(&self, name: &str, value: Option<Value>) -> Result<(), MapTreeError> {
        let id = &self.shared.id;
        self.shared.update(
            |engine| engine.set_paint_property(id, name, value.as_ref()),
            |spec| match value.clone() {
                Some(value) => spec.paint.set(name, value),
                None => spec.paint.unset(name),
            },
        )
    }

    /// Sets (`Some`) or unsets (`None`) a layout property.
    pub fn set_layout_property(
        &self,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), MapTreeError> {
        let id = &self.shared.id;
        self.shared.update(
            |engine| engine.set_layout_property(id, name, value.as_ref()),
            |spec| match value.clone() {
                Some(value) => spec.layout.set(name, value),
                None => spec.layout.unset(name),
            },
        )
    }

    /// Sets or clears the filter expression.
    pub fn set_filter(&self, filter: Option<Value>) -> Result<(), MapTreeError> {
        let id = &self.shared.id;
        self.shared.update(
            |engine| engine.set_filter(id, filter.as_ref()),
            |spec| spec.filter = filter.clone(),
        )
    }

    /// Removes the layer from the map.
    pub fn unmount(&self) -> Result<(), MapTreeError> {
        self.scope.unmount()
    }
}

impl std::fmt::Debug for LayerConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerConsumer")
            .field("id", &self.shared.id)
            .field("source", &self.shared.source.source_id())
            .field("state", &self.state())
            .finish()
    }
}
