//! [`SourceProvider`] registers a data source with the map and publishes a [`SourceContext`]
//! for the layers that draw it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::{Scope, SOURCE_KEY};
use crate::error::MapTreeError;
use crate::map::{MapContext, SubscriptionId};
use crate::registration::{unique_id, RegistrationState};

mod spec;

pub use spec::{GeoJsonData, GeoJsonSource, SourceData, SourceSpec, SourceType, VectorSource};

struct SourceShared {
    id: String,
    map: MapContext,
    data: Mutex<SourceData>,
    state: Mutex<RegistrationState>,
    subscription: Mutex<Option<SubscriptionId>>,
    children: Mutex<Vec<String>>,
}

impl SourceShared {
    fn register(&self) -> Result<(), MapTreeError> {
        let data = self.data.lock();
        let mut state = self.state.lock();
        if *state != RegistrationState::Unregistered {
            return Ok(());
        }

        self.map
            .map()
            .with_engine_mut(|engine| engine.add_source(&self.id, &data))??;
        *state = RegistrationState::Registered;

        log::debug!("Source `{}` ({}) added to the map", self.id, data.source_type());
        Ok(())
    }

    fn teardown(&self) -> Result<(), MapTreeError> {
        if let Some(subscription) = self.subscription.lock().take() {
            self.map.loaded().unsubscribe(subscription);
        }

        let previous = std::mem::replace(&mut *self.state.lock(), RegistrationState::Disposed);
        let children = std::mem::take(&mut *self.children.lock());
        {
            let mut registry = self.map.registry().lock();
            for layer_id in &children {
                registry.release_layer(layer_id);
            }
            registry.release_source(&self.id);
        }

        if previous != RegistrationState::Registered {
            return Ok(());
        }

        let result = self.map.map().with_engine_mut(|engine| {
            let mut errors = vec![];
            for layer_id in children.iter().rev() {
                if engine.has_layer(layer_id) {
                    log::debug!("Removing layer `{layer_id}` left on source `{}`", self.id);
                    if let Err(err) = engine.remove_layer(layer_id) {
                        errors.push(err);
                    }
                }
            }

            if engine.has_source(&self.id) {
                if let Err(err) = engine.remove_source(&self.id) {
                    errors.push(err);
                }
            }

            errors
        });

        match result {
            Ok(errors) => {
                log::debug!("Source `{}` removed from the map", self.id);
                MapTreeError::collect(errors)
            }
            // The engine was destroyed before this source unmounted.
            Err(MapTreeError::MapDestroyed) => {
                log::warn!("Source `{}` outlived its map, nothing to remove", self.id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Capability published by a [`SourceProvider`] to its descendants.
#[derive(Clone)]
pub struct SourceContext {
    shared: Arc<SourceShared>,
}

impl SourceContext {
    /// Finds the source context of the nearest enclosing [`SourceProvider`].
    pub fn lookup(scope: &Scope) -> Option<Arc<SourceContext>> {
        scope.lookup::<SourceContext>(&SOURCE_KEY)
    }

    /// Id of the source. It does not change while the provider is mounted.
    pub fn source_id(&self) -> &str {
        &self.shared.id
    }

    /// Context of the map the source belongs to.
    pub fn map(&self) -> &MapContext {
        &self.shared.map
    }

    /// Declares a layer as drawing this source.
    ///
    /// Declared layers are removed from the engine before the source itself is removed. Adding
    /// the same id several times is allowed. Fails with [`MapTreeError::LayerOwnedElsewhere`] if
    /// the id is declared by another source of the same map.
    pub fn add_child_layer(&self, id: &str) -> Result<(), MapTreeError> {
        if *self.shared.state.lock() == RegistrationState::Disposed {
            return Err(MapTreeError::Unmounted);
        }

        let mut registry = self.shared.map.registry().lock();
        match registry.layer_owner(id) {
            Some(owner) if owner == self.shared.id => Ok(()),
            Some(owner) => Err(MapTreeError::LayerOwnedElsewhere {
                layer_id: id.to_string(),
                source_id: owner.to_string(),
            }),
            None => {
                registry.claim_layer(id, &self.shared.id);
                self.shared.children.lock().push(id.to_string());
                Ok(())
            }
        }
    }

    /// Ids of the layers declared for this source, in declaration order.
    pub fn child_layers(&self) -> Vec<String> {
        self.shared.children.lock().clone()
    }

    pub(crate) fn remove_child_layer(&self, id: &str) {
        let mut registry = self.shared.map.registry().lock();
        let mut children = self.shared.children.lock();
        if let Some(index) = children.iter().position(|child| child == id) {
            children.remove(index);
            registry.release_layer(id);
        }
    }
}

impl std::fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContext")
            .field("id", &self.shared.id)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

/// Component that adds a data source to the map of the enclosing [`MapProvider`](crate::MapProvider).
///
/// The source is added to the engine once the map has loaded. When the provider is unmounted,
/// the layers of the source are removed first, then the source itself.
#[derive(Debug, Clone)]
pub struct SourceProvider {
    scope: Scope,
    context: SourceContext,
}

impl SourceProvider {
    /// Mounts the source provider as a child of `parent`.
    ///
    /// Fails if there is no map provider among the ancestors, if the configuration is invalid or
    /// if the id is already used by another source of the map. If the map is already loaded, the
    /// source is added to the engine right away and errors of the engine are returned.
    pub fn mount(parent: &Scope, spec: SourceSpec) -> Result<Self, MapTreeError> {
        let map = MapContext::lookup(parent).ok_or(MapTreeError::MissingContext {
            component: "SourceProvider",
            provider: "MapProvider",
        })?;

        spec.data.validate()?;
        let id = match spec.id {
            Some(id) if id.is_empty() => {
                return Err(MapTreeError::Configuration("source id is empty".into()))
            }
            Some(id) => id,
            None => unique_id("source"),
        };

        map.registry().lock().claim_source(&id)?;
        let exists_in_engine = map.loaded().is_loaded()
            && map
                .map()
                .with_engine(|engine| engine.has_source(&id))
                .unwrap_or(false);
        if exists_in_engine {
            map.registry().lock().release_source(&id);
            return Err(MapTreeError::DuplicateSource(id));
        }

        let scope = match parent.child() {
            Ok(scope) => scope,
            Err(err) => {
                map.registry().lock().release_source(&id);
                return Err(err);
            }
        };

        let shared = Arc::new(SourceShared {
            id,
            map: (*map).clone(),
            data: Mutex::new(spec.data),
            state: Mutex::new(RegistrationState::Unregistered),
            subscription: Mutex::new(None),
            children: Mutex::new(vec![]),
        });

        let context = SourceContext {
            shared: shared.clone(),
        };
        scope.provide(&SOURCE_KEY, context.clone());

        let teardown = shared.clone();
        scope.on_unmount(move || teardown.teardown())?;

        let registration = shared.clone();
        match map.loaded().subscribe(move || registration.register()) {
            Ok(subscription) => *shared.subscription.lock() = subscription,
            Err(err) => {
                if let Err(teardown_err) = scope.unmount() {
                    log::warn!("Failed to unmount source `{}`: {teardown_err}", shared.id);
                }
                return Err(err);
            }
        }

        Ok(Self { scope, context })
    }

    /// Scope to mount the layers of the source into.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Id of the source.
    pub fn id(&self) -> &str {
        self.context.source_id()
    }

    /// Context published by the provider.
    pub fn context(&self) -> &SourceContext {
        &self.context
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        *self.context.shared.state.lock()
    }

    /// Current configuration of the source.
    pub fn data(&self) -> SourceData {
        self.context.shared.data.lock().clone()
    }

    /// Replaces the data of the source.
    ///
    /// If the source is already in the engine, its data is updated in place. Passing data equal to
    /// the current one does nothing. Changing the type of the source is not supported: unmount the
    /// provider and mount a new one instead.
    pub fn update(&self, data: SourceData) -> Result<(), MapTreeError> {
        data.validate()?;

        let shared = &self.context.shared;
        let mut current = shared.data.lock();
        let state = *shared.state.lock();
        if state == RegistrationState::Disposed {
            return Err(MapTreeError::Unmounted);
        }

        if current.source_type() != data.source_type() {
            return Err(MapTreeError::SourceTypeChanged {
                id: shared.id.clone(),
                from: current.source_type(),
                to: data.source_type(),
            });
        }

        if *current == data {
            log::trace!("Source `{}` data is unchanged", shared.id);
            return Ok(());
        }

        if state == RegistrationState::Registered {
            shared
                .map
                .map()
                .with_engine_mut(|engine| engine.update_source(&shared.id, &data))??;
            log::debug!("Source `{}` data updated", shared.id);
        }

        *current = data;
        Ok(())
    }

    /// Unmounts the layers of the source and removes the source from the map.
    pub fn unmount(&self) -> Result<(), MapTreeError> {
        self.scope.unmount()
    }
}
