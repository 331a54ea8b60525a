use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::engine::{EngineCall, HeadlessEngine};
use crate::map::{MapHandle, MapOptions};

mod lifecycle;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn options() -> MapOptions {
    MapOptions::new("map", "https://example.com/style.json")
}

pub(crate) fn point_collection(lng: f64, lat: f64) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![lng, lat]))),
            id: None,
            properties: None,
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

pub(crate) fn with_headless<R>(map: &MapHandle, f: impl FnOnce(&HeadlessEngine) -> R) -> R {
    map.with_engine(|engine| {
        f(engine
            .as_any()
            .downcast_ref::<HeadlessEngine>()
            .expect("not a headless engine"))
    })
    .expect("map is destroyed")
}

pub(crate) fn calls(map: &MapHandle) -> Vec<EngineCall> {
    with_headless(map, |engine| engine.calls())
}
