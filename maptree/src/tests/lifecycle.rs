use std::sync::Arc;

use assert_matches::assert_matches;
use parking_lot::Mutex;
use serde_json::json;

use super::*;
use crate::context::{Scope, Tree};
use crate::engine::{EngineJournal, HeadlessEngineFactory, MapEngine};
use crate::error::MapTreeError;
use crate::layer::{LayerConsumer, LayerSpec, LayerType};
use crate::map::{MapProvider, ReadyNotifier};
use crate::source::{SourceData, SourceProvider, SourceSpec, SourceType};
use crate::RegistrationState;

fn mount_map(scope: &Scope) -> MapProvider {
    init_logger();
    MapProvider::mount(scope, &HeadlessEngineFactory::default(), options()).unwrap()
}

fn mount_source(map: &MapProvider, id: &str) -> SourceProvider {
    SourceProvider::mount(
        map.scope(),
        SourceSpec::geojson(point_collection(10.0, 20.0)).with_id(id),
    )
    .unwrap()
}

fn fill_layer(id: &str) -> LayerSpec {
    LayerSpec::new(LayerType::Fill).with_id(id)
}

fn add_source(id: &str) -> EngineCall {
    EngineCall::AddSource {
        id: id.into(),
        source_type: SourceType::GeoJson,
    }
}

fn add_layer(id: &str, source: &str) -> EngineCall {
    EngineCall::AddLayer {
        id: id.into(),
        source: source.into(),
    }
}

#[test]
fn registration_waits_for_loaded_signal() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    assert!(calls(map.map()).is_empty());
    assert_eq!(source.state(), RegistrationState::Unregistered);
    assert_eq!(layer.state(), RegistrationState::Unregistered);

    map.notify_loaded().unwrap();
    assert_eq!(calls(map.map()), vec![add_source("s1"), add_layer("l1", "s1")]);
    assert_eq!(source.state(), RegistrationState::Registered);
    assert_eq!(layer.state(), RegistrationState::Registered);

    map.notify_loaded().unwrap();
    assert_eq!(calls(map.map()).len(), 2);

    let definition = with_headless(map.map(), |engine| engine.layer("l1").cloned()).unwrap();
    assert_eq!(definition.source, "s1");
    assert_eq!(definition.layer_type, LayerType::Fill);
}

#[test]
fn components_mounted_after_load_register_immediately() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    map.notify_loaded().unwrap();

    let source = mount_source(&map, "s1");
    assert_eq!(calls(map.map()), vec![add_source("s1")]);

    LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    assert_eq!(calls(map.map()), vec![add_source("s1"), add_layer("l1", "s1")]);
}

#[test]
fn engine_reporting_ready_at_creation() {
    init_logger();
    let tree = Tree::new();
    let map =
        MapProvider::mount(tree.scope(), &HeadlessEngineFactory::loaded(), options()).unwrap();
    assert!(map.is_loaded());

    let source = mount_source(&map, "s1");
    assert_eq!(source.state(), RegistrationState::Registered);
}

#[test]
fn layer_without_source_fails_before_engine_calls() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    map.notify_loaded().unwrap();

    let result = LayerConsumer::mount(map.scope(), fill_layer("l1"));
    assert_matches!(
        result,
        Err(MapTreeError::MissingContext {
            component: "LayerConsumer",
            provider: "SourceProvider"
        })
    );
    assert!(calls(map.map()).is_empty());
    assert_eq!(map.scope().child_count(), 0);
}

#[test]
fn source_without_map_fails() {
    let tree = Tree::new();
    let result = SourceProvider::mount(tree.scope(), SourceSpec::vector_url("https://example.com"));
    assert_matches!(
        result,
        Err(MapTreeError::MissingContext {
            component: "SourceProvider",
            provider: "MapProvider"
        })
    );
}

#[test]
fn background_layer_is_rejected() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    map.notify_loaded().unwrap();

    assert_matches!(
        LayerConsumer::mount(source.scope(), LayerSpec::new(LayerType::Background)),
        Err(MapTreeError::Configuration(_))
    );
    assert_eq!(calls(map.map()), vec![add_source("s1")]);
    assert!(source.context().child_layers().is_empty());
}

#[test]
fn duplicate_layer_id_keeps_first_layer() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let first = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    assert_matches!(
        LayerConsumer::mount(source.scope(), fill_layer("l1")),
        Err(MapTreeError::DuplicateLayer(id)) if id == "l1"
    );

    let other = mount_source(&map, "s2");
    assert_matches!(
        LayerConsumer::mount(other.scope(), fill_layer("l1")),
        Err(MapTreeError::DuplicateLayer(_))
    );

    map.notify_loaded().unwrap();
    assert_eq!(first.state(), RegistrationState::Registered);
    assert_eq!(
        with_headless(map.map(), |engine| engine.layer("l1").map(|l| l.source.clone())),
        Some("s1".to_string())
    );
    assert_eq!(source.context().child_layers(), vec!["l1".to_string()]);
}

#[test]
fn duplicate_layer_added_outside_the_tree() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    map.notify_loaded().unwrap();

    map.map()
        .with_engine_mut(|engine| {
            engine.add_layer(&LayerSpec::new(LayerType::Line).definition("external", "s1"))
        })
        .unwrap()
        .unwrap();

    assert_matches!(
        LayerConsumer::mount(source.scope(), fill_layer("external")),
        Err(MapTreeError::DuplicateLayer(_))
    );
}

#[test]
fn duplicate_source_id() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let _source = mount_source(&map, "s1");

    assert_matches!(
        SourceProvider::mount(
            map.scope(),
            SourceSpec::vector_url("https://example.com").with_id("s1")
        ),
        Err(MapTreeError::DuplicateSource(id)) if id == "s1"
    );
}

#[test]
fn generated_ids_are_unique() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let a =
        SourceProvider::mount(map.scope(), SourceSpec::vector_url("https://example.com")).unwrap();
    let b =
        SourceProvider::mount(map.scope(), SourceSpec::vector_url("https://example.com")).unwrap();
    assert_ne!(a.id(), b.id());

    let l1 = LayerConsumer::mount(a.scope(), LayerSpec::new(LayerType::Line)).unwrap();
    let l2 = LayerConsumer::mount(a.scope(), LayerSpec::new(LayerType::Line)).unwrap();
    assert_ne!(l1.id(), l2.id());
    assert_eq!(l1.source_id(), a.id());
}

#[test]
fn unmounting_source_removes_layers_first() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    map.notify_loaded().unwrap();

    source.unmount().unwrap();

    assert_eq!(
        calls(map.map()),
        vec![
            add_source("s1"),
            add_layer("l1", "s1"),
            EngineCall::RemoveLayer("l1".into()),
            EngineCall::RemoveSource("s1".into()),
        ]
    );
    assert_eq!(layer.state(), RegistrationState::Disposed);
    assert_eq!(source.state(), RegistrationState::Disposed);
    assert!(!layer.scope().is_mounted());

    layer.unmount().unwrap();
    assert_eq!(calls(map.map()).len(), 4);
}

#[test]
fn layers_declared_without_consumer_are_removed_before_source() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    map.notify_loaded().unwrap();

    source.context().add_child_layer("labels").unwrap();
    source.context().add_child_layer("labels").unwrap();
    map.map()
        .with_engine_mut(|engine| {
            engine.add_layer(&LayerSpec::new(LayerType::Symbol).definition("labels", "s1"))
        })
        .unwrap()
        .unwrap();

    let other = mount_source(&map, "s2");
    assert_matches!(
        other.context().add_child_layer("labels"),
        Err(MapTreeError::LayerOwnedElsewhere { layer_id, source_id })
            if layer_id == "labels" && source_id == "s1"
    );

    source.unmount().unwrap();
    let calls = calls(map.map());
    assert_eq!(
        calls[calls.len() - 2..],
        [
            EngineCall::RemoveLayer("labels".into()),
            EngineCall::RemoveSource("s1".into())
        ]
    );

    other.context().add_child_layer("labels").unwrap();
}

#[test]
fn unmount_before_load_makes_no_engine_calls() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    layer.unmount().unwrap();
    source.unmount().unwrap();
    map.notify_loaded().unwrap();
    assert!(calls(map.map()).is_empty());

    let source = mount_source(&map, "s1");
    LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    assert_eq!(calls(map.map()), vec![add_source("s1"), add_layer("l1", "s1")]);
}

#[test]
fn map_teardown_order() {
    init_logger();
    let journal = EngineJournal::new();
    let factory = HeadlessEngineFactory::default().with_journal(journal.clone());

    let tree = Tree::new();
    let map = MapProvider::mount(tree.scope(), &factory, options()).unwrap();
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    map.notify_loaded().unwrap();

    let handle = map.map().clone();
    map.unmount().unwrap();

    assert_eq!(
        journal.calls()[2..],
        [
            EngineCall::RemoveLayer("l1".into()),
            EngineCall::RemoveSource("s1".into()),
            EngineCall::Destroy,
        ]
    );
    assert!(handle.is_destroyed());
    assert!(handle.ptr_eq(map.map()));
    assert_matches!(
        handle.with_engine(|engine| engine.has_layer("l1")),
        Err(MapTreeError::MapDestroyed)
    );

    layer.unmount().unwrap();
    assert_matches!(layer.set_filter(None), Err(MapTreeError::Unmounted));
    assert_eq!(journal.calls().len(), 5);
}

#[test]
fn map_unmount_cancels_pending_registrations() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    let observer_ran = Arc::new(Mutex::new(false));
    let flag = observer_ran.clone();
    map.context()
        .loaded()
        .subscribe(move || {
            *flag.lock() = true;
            Ok(())
        })
        .unwrap();

    map.unmount().unwrap();
    map.notify_loaded().unwrap();

    assert!(!*observer_ran.lock());
    assert!(!map.is_loaded());
    assert_eq!(source.state(), RegistrationState::Disposed);
    assert_eq!(layer.state(), RegistrationState::Disposed);
    assert_matches!(
        map.context().loaded().subscribe(|| Ok(())),
        Err(MapTreeError::Unmounted)
    );
}

#[test]
fn ready_notifier_kept_by_factory_after_unmount() {
    init_logger();
    let journal = EngineJournal::new();
    let kept = Arc::new(Mutex::new(None));
    let factory = {
        let journal = journal.clone();
        let kept = kept.clone();
        move |options: &MapOptions,
              ready: ReadyNotifier|
              -> Result<Box<dyn MapEngine>, MapTreeError> {
            *kept.lock() = Some(ready);
            Ok(Box::new(HeadlessEngine::with_journal(
                options.clone(),
                journal.clone(),
            )?))
        }
    };

    let tree = Tree::new();
    let map = MapProvider::mount(tree.scope(), &factory, options()).unwrap();
    let source = mount_source(&map, "s1");
    LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    drop(tree);

    let notifier = kept.lock().take().unwrap();
    notifier.notify().unwrap();
    assert!(!map.is_loaded());
    assert_eq!(journal.calls(), vec![EngineCall::Destroy]);
}

#[test]
fn teardown_after_engine_destroyed_is_benign() {
    init_logger();
    let journal = EngineJournal::new();
    let factory = HeadlessEngineFactory::default().with_journal(journal.clone());

    let tree = Tree::new();
    let map = MapProvider::mount(tree.scope(), &factory, options()).unwrap();
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();
    map.notify_loaded().unwrap();

    map.map().destroy();
    source.unmount().unwrap();

    assert_eq!(layer.state(), RegistrationState::Disposed);
    assert_eq!(source.state(), RegistrationState::Disposed);
    assert_eq!(journal.calls().last(), Some(&EngineCall::Destroy));
    assert_eq!(journal.calls().len(), 3);

    map.unmount().unwrap();
    assert_eq!(journal.calls().len(), 3);
}

#[test]
fn dropping_tree_destroys_map() {
    init_logger();
    let journal = EngineJournal::new();
    let factory = HeadlessEngineFactory::loaded().with_journal(journal.clone());

    let tree = Tree::new();
    let map = MapProvider::mount(tree.scope(), &factory, options()).unwrap();
    let source = mount_source(&map, "s1");
    LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    drop(tree);
    assert_eq!(journal.calls().last(), Some(&EngineCall::Destroy));
    assert!(map.map().is_destroyed());
    assert!(!source.scope().is_mounted());
}

#[test]
fn engine_construction_error_is_returned() {
    let tree = Tree::new();
    let result = MapProvider::mount(
        tree.scope(),
        &HeadlessEngineFactory::default(),
        MapOptions::new("", "https://example.com/style.json"),
    );

    assert_matches!(result, Err(MapTreeError::Engine(_)));
    assert_eq!(tree.scope().child_count(), 0);
}

#[test]
fn custom_factory_closure() {
    let tree = Tree::new();
    let factory = |options: &MapOptions,
                   ready: ReadyNotifier|
     -> Result<Box<dyn MapEngine>, MapTreeError> {
        let engine = HeadlessEngine::new(options.clone())?;
        ready.notify()?;
        Ok(Box::new(engine))
    };

    let map = MapProvider::mount(tree.scope(), &factory, options()).unwrap();
    assert!(map.is_loaded());
}

#[test]
fn deferred_failures_are_reported_by_notify() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    LayerConsumer::mount(source.scope(), fill_layer("l1")).unwrap();

    let conflicting = SourceSpec::vector_url("https://example.com").data;
    map.map()
        .with_engine_mut(|engine| {
            engine.add_source("s1", &conflicting)?;
            engine.add_layer(&LayerSpec::new(LayerType::Line).definition("l1", "s1"))
        })
        .unwrap()
        .unwrap();

    assert_matches!(map.notify_loaded(), Err(MapTreeError::Multiple(errors)) if errors.len() == 2);
    assert_eq!(source.state(), RegistrationState::Unregistered);
    assert!(map.is_loaded());
}

#[test]
fn source_update_is_idempotent() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    map.notify_loaded().unwrap();

    let data = SourceSpec::geojson(point_collection(30.0, 40.0)).data;
    source.update(data.clone()).unwrap();
    source.update(data.clone()).unwrap();

    with_headless(map.map(), |engine| {
        assert_eq!(engine.source_ids(), vec!["s1"]);
        assert_eq!(engine.source("s1"), Some(&data));
    });
    assert_eq!(
        calls(map.map()),
        vec![add_source("s1"), EngineCall::UpdateSource("s1".into())]
    );
}

#[test]
fn source_update_before_load_is_used_for_registration() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");

    let data = SourceSpec::geojson(point_collection(30.0, 40.0)).data;
    source.update(data.clone()).unwrap();
    assert!(calls(map.map()).is_empty());

    map.notify_loaded().unwrap();
    assert_eq!(with_headless(map.map(), |e| e.source("s1").cloned()), Some(data));
    assert_eq!(calls(map.map()), vec![add_source("s1")]);
}

#[test]
fn source_type_change_is_rejected() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");

    let result = source.update(SourceSpec::vector_url("https://example.com").data);
    assert_matches!(
        result,
        Err(MapTreeError::SourceTypeChanged {
            from: SourceType::GeoJson,
            to: SourceType::Vector,
            ..
        })
    );
    assert_matches!(source.data(), SourceData::GeoJson(_));
}

#[test]
fn layer_property_updates() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let layer = LayerConsumer::mount(
        source.scope(),
        fill_layer("l1").with_paint("fill-opacity", 0.5),
    )
    .unwrap();

    layer
        .set_paint_property("fill-color", Some(json!("#00ff00")))
        .unwrap();
    layer.set_paint_property("fill-opacity", None).unwrap();
    assert!(calls(map.map()).is_empty());

    map.notify_loaded().unwrap();
    let paint = with_headless(map.map(), |e| e.layer("l1").map(|l| l.paint.clone())).unwrap();
    assert_eq!(serde_json::Value::Object(paint), json!({"fill-color": "#00ff00"}));

    layer
        .set_layout_property("visibility", Some(json!("none")))
        .unwrap();
    layer.set_filter(Some(json!(["==", "kind", "lake"]))).unwrap();

    let definition = with_headless(map.map(), |e| e.layer("l1").cloned()).unwrap();
    assert_eq!(definition.layout.get("visibility"), Some(&json!("none")));
    assert_eq!(definition.filter, Some(json!(["==", "kind", "lake"])));
    assert_eq!(layer.spec().filter, definition.filter);
}

#[test]
fn layer_in_nested_scope_finds_source() {
    let tree = Tree::new();
    let map = mount_map(tree.scope());
    let source = mount_source(&map, "s1");
    let group = source.scope().child().unwrap();
    let layer = LayerConsumer::mount(&group, fill_layer("l1")).unwrap();
    map.notify_loaded().unwrap();

    assert_eq!(layer.source_id(), "s1");

    group.unmount().unwrap();
    assert_eq!(
        calls(map.map()).last(),
        Some(&EngineCall::RemoveLayer("l1".into()))
    );
    assert!(source.context().child_layers().is_empty());
}

#[test]
fn layer_belongs_to_nearest_map() {
    let tree = Tree::new();
    let outer = mount_map(tree.scope());
    let source = mount_source(&outer, "s1");

    let inner =
        MapProvider::mount(source.scope(), &HeadlessEngineFactory::default(), options()).unwrap();
    assert_matches!(
        LayerConsumer::mount(inner.scope(), fill_layer("l1")),
        Err(MapTreeError::Configuration(_))
    );
}
