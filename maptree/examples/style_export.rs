//! This example builds a component tree over a headless engine, lets the engine "load" and prints
//! the resulting style document. It also shows how to place the camera on the centroid of the data
//! and how to anchor a popup on the world copy that was clicked.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use maptree::context::Tree;
use maptree::engine::{HeadlessEngine, HeadlessEngineFactory};
use maptree::layer::{LayerConsumer, LayerSpec, LayerType};
use maptree::map::{MapOptions, MapProvider};
use maptree::source::{SourceProvider, SourceSpec};
use maptree::{centroid, coordinates_at_click};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let islands = islands();
    let center = centroid(&islands)?;
    log::info!("Centering the map at {center:?}");

    let tree = Tree::new();
    let map = MapProvider::mount(
        tree.scope(),
        &HeadlessEngineFactory::default(),
        MapOptions::new("map", "https://demotiles.maplibre.org/style.json")
            .with_center(center)
            .with_zoom(3.0),
    )?;

    let source = SourceProvider::mount(
        map.scope(),
        SourceSpec::geojson(islands).with_id("islands"),
    )?;
    LayerConsumer::mount(
        source.scope(),
        LayerSpec::new(LayerType::Circle)
            .with_id("islands-points")
            .with_paint("circle-radius", 6)
            .with_paint("circle-color", "#d04030")
            .with_unset_paint("circle-opacity"),
    )?;
    LayerConsumer::mount(
        source.scope(),
        LayerSpec::new(LayerType::Symbol)
            .with_id("islands-labels")
            .with_layout("text-field", json!(["get", "name"]))
            .with_minzoom(5.0),
    )?;

    map.notify_loaded()?;

    let style = map.map().with_engine(|engine| {
        engine
            .as_any()
            .downcast_ref::<HeadlessEngine>()
            .map(HeadlessEngine::to_style)
    })?;
    if let Some(style) = style {
        println!("{}", serde_json::to_string_pretty(&style?)?);
    }

    let clicked_lon = 170.0;
    let popup = coordinates_at_click(maptree::LngLat::new(-178.1, -17.7), clicked_lon);
    log::info!("Popup for a click at {clicked_lon} is shown at {popup:?}");

    tree.close()?;
    Ok(())
}

fn islands() -> FeatureCollection {
    let points = [("Fiji", 178.4, -17.7), ("Tonga", -175.2, -21.1)];
    FeatureCollection {
        bbox: None,
        features: points
            .into_iter()
            .map(|(name, lng, lat)| {
                let mut properties = geojson::JsonObject::new();
                properties.insert("name".into(), name.into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![lng, lat]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect(),
        foreign_members: None,
    }
}
