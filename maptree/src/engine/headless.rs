//! In-memory engine that keeps track of sources and layers without rendering anything.
//!
//! The headless engine validates operations the same way a rendering engine does, keeps a journal
//! of applied [`EngineCall`]s and can export its state as a style document. It is used for
//! server-side style generation and for testing component trees.

use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use super::{EngineFactory, MapEngine};
use crate::error::MapTreeError;
use crate::layer::LayerDefinition;
use crate::map::{MapOptions, MapStyle, ReadyNotifier};
use crate::source::{SourceData, SourceType};

/// Operation applied to a [`HeadlessEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// A source was added.
    AddSource {
        /// Source id.
        id: String,
        /// Source type.
        source_type: SourceType,
    },
    /// Data of a source was replaced.
    UpdateSource(String),
    /// A source was removed.
    RemoveSource(String),
    /// A layer was added.
    AddLayer {
        /// Layer id.
        id: String,
        /// Id of the source of the layer.
        source: String,
    },
    /// A layer was removed.
    RemoveLayer(String),
    /// A paint property was changed.
    SetPaintProperty {
        /// Layer id.
        layer: String,
        /// Property name.
        name: String,
        /// New value, `None` if the property was unset.
        value: Option<Value>,
    },
    /// A layout property was changed.
    SetLayoutProperty {
        /// Layer id.
        layer: String,
        /// Property name.
        name: String,
        /// New value, `None` if the property was unset.
        value: Option<Value>,
    },
    /// A layer filter was changed.
    SetFilter {
        /// Layer id.
        layer: String,
        /// New filter.
        filter: Option<Value>,
    },
    /// The engine was destroyed.
    Destroy,
}

/// Shared list of operations applied to a [`HeadlessEngine`].
///
/// The journal outlives the engine, so it can be inspected after the map is destroyed.
#[derive(Debug, Clone, Default)]
pub struct EngineJournal(Arc<Mutex<Vec<EngineCall>>>);

impl EngineJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded operations, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.0.lock().clone()
    }

    fn push(&self, call: EngineCall) {
        log::trace!("Headless engine: {call:?}");
        self.0.lock().push(call);
    }
}

/// Map engine that stores sources and layers in memory.
#[derive(Debug)]
pub struct HeadlessEngine {
    options: MapOptions,
    sources: AHashMap<String, SourceData>,
    layers: Vec<LayerDefinition>,
    journal: EngineJournal,
    destroyed: bool,
}

impl HeadlessEngine {
    /// Creates a new engine, checking the options the way a rendering engine would.
    pub fn new(options: MapOptions) -> Result<Self, MapTreeError> {
        Self::with_journal(options, EngineJournal::new())
    }

    /// Creates a new engine that records its operations into `journal`.
    pub fn with_journal(options: MapOptions, journal: EngineJournal) -> Result<Self, MapTreeError> {
        if options.container.trim().is_empty() {
            return Err(MapTreeError::Engine("map container is not set".into()));
        }

        match &options.style {
            MapStyle::Url(url) if url.trim().is_empty() => {
                return Err(MapTreeError::Engine("style url is empty".into()));
            }
            MapStyle::Document(document) => validate_style_document(document)?,
            MapStyle::Url(_) => {}
        }

        if !options.zoom.is_finite() || options.zoom < 0.0 {
            return Err(MapTreeError::Engine(format!(
                "invalid zoom level {}",
                options.zoom
            )));
        }

        if !(-90.0..=90.0).contains(&options.center.lat) || !options.center.lng.is_finite() {
            return Err(MapTreeError::Engine(format!(
                "invalid map center {:?}",
                options.center
            )));
        }

        Ok(Self {
            options,
            sources: AHashMap::new(),
            layers: vec![],
            journal,
            destroyed: false,
        })
    }

    /// Options the engine was created with.
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// All operations applied to the engine so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.calls()
    }

    /// Journal of the engine.
    pub fn journal(&self) -> &EngineJournal {
        &self.journal
    }

    /// Data of a source.
    pub fn source(&self, id: &str) -> Option<&SourceData> {
        self.sources.get(id)
    }

    /// Sorted ids of all sources.
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.sources.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// A layer by its id.
    pub fn layer(&self, id: &str) -> Option<&LayerDefinition> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// All layers in drawing order.
    pub fn layers(&self) -> &[LayerDefinition] {
        &self.layers
    }

    /// Returns true after [`MapEngine::destroy`] was called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Exports current sources and layers as a style document.
    pub fn to_style(&self) -> Result<Value, MapTreeError> {
        let mut sources = Map::new();
        for id in self.source_ids() {
            if let Some(source) = self.sources.get(id) {
                sources.insert(id.to_string(), to_json(source)?);
            }
        }

        let layers = self
            .layers
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(json!({
            "version": 8,
            "center": [self.options.center.lng, self.options.center.lat],
            "zoom": self.options.zoom,
            "sources": sources,
            "layers": layers,
        }))
    }

    fn check_alive(&self) -> Result<(), MapTreeError> {
        if self.destroyed {
            return Err(MapTreeError::Engine("map is destroyed".into()));
        }

        Ok(())
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerDefinition, MapTreeError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or_else(|| MapTreeError::Engine(format!("layer `{id}` does not exist")))
    }
}

fn to_json(value: &impl serde::Serialize) -> Result<Value, MapTreeError> {
    serde_json::to_value(value).map_err(|err| MapTreeError::Engine(err.to_string()))
}

fn validate_style_document(document: &Value) -> Result<(), MapTreeError> {
    let Some(object) = document.as_object() else {
        return Err(MapTreeError::Engine(
            "style document must be an object".into(),
        ));
    };

    if object.get("version") != Some(&json!(8)) {
        return Err(MapTreeError::Engine(
            "style document must have version 8".into(),
        ));
    }

    if !object.get("layers").is_some_and(Value::is_array) {
        return Err(MapTreeError::Engine(
            "style document must contain a `layers` array".into(),
        ));
    }

    Ok(())
}

fn set_property(properties: &mut Map<String, Value>, name: &str, value: Option<&Value>) {
    match value {
        Some(value) => {
            properties.insert(name.to_string(), value.clone());
        }
        None => {
            properties.remove(name);
        }
    }
}

impl MapEngine for HeadlessEngine {
    fn add_source(&mut self, id: &str, source: &SourceData) -> Result<(), MapTreeError> {
        self.check_alive()?;
        if self.sources.contains_key(id) {
            return Err(MapTreeError::Engine(format!(
                "there is already a source with id `{id}`"
            )));
        }

        self.sources.insert(id.to_string(), source.clone());
        self.journal.push(EngineCall::AddSource {
            id: id.to_string(),
            source_type: source.source_type(),
        });
        Ok(())
    }

    fn update_source(&mut self, id: &str, source: &SourceData) -> Result<(), MapTreeError> {
        self.check_alive()?;
        let Some(existing) = self.sources.get_mut(id) else {
            return Err(MapTreeError::Engine(format!("source `{id}` does not exist")));
        };

        if existing.source_type() != source.source_type() {
            return Err(MapTreeError::Engine(format!(
                "source `{id}` is of type {}, cannot update it with {} data",
                existing.source_type(),
                source.source_type()
            )));
        }

        *existing = source.clone();
        self.journal.push(EngineCall::UpdateSource(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), MapTreeError> {
        self.check_alive()?;
        if !self.sources.contains_key(id) {
            return Err(MapTreeError::Engine(format!("source `{id}` does not exist")));
        }

        if let Some(layer) = self.layers.iter().find(|layer| layer.source == id) {
            return Err(MapTreeError::Engine(format!(
                "source `{id}` cannot be removed while layer `{}` is using it",
                layer.id
            )));
        }

        self.sources.remove(id);
        self.journal.push(EngineCall::RemoveSource(id.to_string()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_layer(&mut self, layer: &LayerDefinition) -> Result<(), MapTreeError> {
        self.check_alive()?;
        if self.has_layer(&layer.id) {
            return Err(MapTreeError::Engine(format!(
                "layer with id `{}` already exists on this map",
                layer.id
            )));
        }

        if !self.sources.contains_key(&layer.source) {
            return Err(MapTreeError::Engine(format!(
                "source `{}` of layer `{}` does not exist",
                layer.source, layer.id
            )));
        }

        self.layers.push(layer.clone());
        self.journal.push(EngineCall::AddLayer {
            id: layer.id.clone(),
            source: layer.source.clone(),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), MapTreeError> {
        self.check_alive()?;
        let Some(index) = self.layers.iter().position(|layer| layer.id == id) else {
            return Err(MapTreeError::Engine(format!("layer `{id}` does not exist")));
        };

        self.layers.remove(index);
        self.journal.push(EngineCall::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), MapTreeError> {
        self.check_alive()?;
        set_property(&mut self.layer_mut(layer_id)?.paint, name, value);
        self.journal.push(EngineCall::SetPaintProperty {
            layer: layer_id.to_string(),
            name: name.to_string(),
            value: value.cloned(),
        });
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), MapTreeError> {
        self.check_alive()?;
        set_property(&mut self.layer_mut(layer_id)?.layout, name, value);
        self.journal.push(EngineCall::SetLayoutProperty {
            layer: layer_id.to_string(),
            name: name.to_string(),
            value: value.cloned(),
        });
        Ok(())
    }

    fn set_filter(&mut self, layer_id: &str, filter: Option<&Value>) -> Result<(), MapTreeError> {
        self.check_alive()?;
        self.layer_mut(layer_id)?.filter = filter.cloned();
        self.journal.push(EngineCall::SetFilter {
            layer: layer_id.to_string(),
            filter: filter.cloned(),
        });
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }

        self.destroyed = true;
        self.layers.clear();
        self.sources.clear();
        self.journal.push(EngineCall::Destroy);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Creates [`HeadlessEngine`]s.
///
/// By default the created engine waits for the host to report that the map has loaded (see
/// [`MapProvider::notify_loaded`](crate::MapProvider::notify_loaded)). Use
/// [`HeadlessEngineFactory::loaded`] for engines that are ready right after creation.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEngineFactory {
    load_on_create: bool,
    journal: Option<EngineJournal>,
}

impl HeadlessEngineFactory {
    /// Factory of engines that report being loaded as soon as they are created.
    pub fn loaded() -> Self {
        Self {
            load_on_create: true,
            journal: None,
        }
    }

    /// Makes created engines record their operations into `journal`.
    pub fn with_journal(mut self, journal: EngineJournal) -> Self {
        self.journal = Some(journal);
        self
    }
}

impl EngineFactory for HeadlessEngineFactory {
    fn create(
        &self,
        options: &MapOptions,
        ready: ReadyNotifier,
    ) -> Result<Box<dyn MapEngine>, MapTreeError> {
        let journal = self.journal.clone().unwrap_or_default();
        let engine = HeadlessEngine::with_journal(options.clone(), journal)?;
        if self.load_on_create {
            ready.notify()?;
        }

        Ok(Box::new(engine))
    }
}
