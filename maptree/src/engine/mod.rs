//! Interface of the map engine the components drive.
//!
//! The components never render anything themselves. They translate their lifecycle into calls
//! against a [`MapEngine`]: a source provider adds and removes a source, a layer consumer adds and
//! removes a layer. An engine is created by an [`EngineFactory`] when a
//! [`MapProvider`](crate::MapProvider) is mounted.

use std::any::Any;

use serde_json::Value;

use crate::error::MapTreeError;
use crate::layer::LayerDefinition;
use crate::map::{MapOptions, ReadyNotifier};
use crate::source::SourceData;

pub mod headless;

pub use headless::{EngineCall, EngineJournal, HeadlessEngine, HeadlessEngineFactory};

/// Imperative API of a map engine instance.
///
/// Implementations report invalid operations (e.g. adding a layer with an id that is already
/// used, or a layer that references a missing source) as [`MapTreeError::Engine`].
pub trait MapEngine: Send + Sync {
    /// Adds a new source with the given id.
    fn add_source(&mut self, id: &str, source: &SourceData) -> Result<(), MapTreeError>;
    /// Replaces the data of an existing source.
    fn update_source(&mut self, id: &str, source: &SourceData) -> Result<(), MapTreeError>;
    /// Removes a source. Fails if any layer still uses it.
    fn remove_source(&mut self, id: &str) -> Result<(), MapTreeError>;
    /// Returns true if a source with the id exists.
    fn has_source(&self, id: &str) -> bool;

    /// Adds a layer on top of the existing ones.
    fn add_layer(&mut self, layer: &LayerDefinition) -> Result<(), MapTreeError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), MapTreeError>;
    /// Returns true if a layer with the id exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Sets a paint property of a layer. `None` resets the property to the engine default.
    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), MapTreeError>;
    /// Sets a layout property of a layer. `None` resets the property to the engine default.
    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), MapTreeError>;
    /// Sets or clears the filter expression of a layer.
    fn set_filter(&mut self, layer_id: &str, filter: Option<&Value>) -> Result<(), MapTreeError>;

    /// Releases all resources of the engine, including all its sources and layers.
    fn destroy(&mut self);

    /// A map stores the engine as a trait object. This method can be used to convert the trait object into the concrete type.
    fn as_any(&self) -> &dyn Any;
    /// A map stores the engine as a trait object. This method can be used to convert the trait object into the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Constructs engine instances for [`MapProvider`](crate::MapProvider)s.
pub trait EngineFactory {
    /// Creates a new engine instance mounted to `options.container`.
    ///
    /// The engine must call [`ReadyNotifier::notify`] once it has loaded its style and resources,
    /// unless the host application forwards this event through
    /// [`MapProvider::notify_loaded`](crate::MapProvider::notify_loaded) instead. The notifier must
    /// not be called while the engine itself is borrowed through its
    /// [`MapHandle`](crate::MapHandle).
    fn create(
        &self,
        options: &MapOptions,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn MapEngine>, MapTreeError>;
}

impl<F> EngineFactory for F
where
    F: Fn(&MapOptions, ReadyNotifier) -> Result<Box<dyn MapEngine>, MapTreeError>,
{
    fn create(
        &self,
        options: &MapOptions,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn MapEngine>, MapTreeError> {
        self(options, ready)
    }
}
