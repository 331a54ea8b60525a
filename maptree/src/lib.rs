//! Maptree exposes a map engine through a tree of declarative components.
//!
//! # Components
//!
//! * [`MapProvider`] creates a map engine and publishes a [`MapContext`] with the engine handle and
//!   a one-shot "loaded" signal.
//! * [`SourceProvider`] adds a data source to the map once it has loaded and publishes a
//!   [`SourceContext`] for the layers drawing that source.
//! * [`LayerConsumer`] finds the nearest source and map, and adds a layer once the map has
//!   loaded.
//!
//! Components are mounted into [scopes](context::Scope). A component never holds references to
//! its ancestors; it looks up the capability it needs by [key](context::ContextKey) in the
//! enclosing scopes. Unmounting a scope removes everything mounted into it, children first, so a
//! layer is always removed before its source and a source before the map is destroyed.
//!
//! ```
//! use maptree::context::Tree;
//! use maptree::engine::HeadlessEngineFactory;
//! use maptree::layer::{LayerConsumer, LayerSpec, LayerType};
//! use maptree::map::{MapOptions, MapProvider};
//! use maptree::source::{GeoJsonData, SourceProvider, SourceSpec};
//!
//! let tree = Tree::new();
//! let map = MapProvider::mount(
//!     tree.scope(),
//!     &HeadlessEngineFactory::default(),
//!     MapOptions::new("map", "https://example.com/style.json"),
//! )?;
//!
//! let lakes = SourceProvider::mount(
//!     map.scope(),
//!     SourceSpec::geojson(GeoJsonData::url("https://example.com/lakes.geojson")).with_id("lakes"),
//! )?;
//! LayerConsumer::mount(
//!     lakes.scope(),
//!     LayerSpec::new(LayerType::Fill).with_paint("fill-color", "#3070d0"),
//! )?;
//!
//! // Nothing is added to the engine until it reports that its style is loaded.
//! map.notify_loaded()?;
//! # Ok::<(), maptree::error::MapTreeError>(())
//! ```
//!
//! The geometry helpers of [`maptree_types`] are reexported for popups and camera placement:
//! [`coordinates_at_click`] and [`centroid`].

pub mod context;
pub mod engine;
pub mod error;
pub mod layer;
pub mod map;
mod registration;
pub mod source;

#[cfg(test)]
mod tests;

pub use layer::LayerConsumer;
pub use map::{MapContext, MapHandle, MapProvider};
pub use registration::RegistrationState;
pub use source::{SourceContext, SourceProvider};

// Reexport maptree_types
pub use maptree_types;
pub use maptree_types::{centroid, coordinates_at_click, LngLat};
