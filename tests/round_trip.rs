//! Export, then load back through the runtime contract.

use std::fs;
use std::path::Path;

use sceneweave::config::ExportSettings;
use sceneweave::core::{ExportableObject, SceneGraph, SceneSource, Transform, Value};
use sceneweave::emit::Exporter;
use sceneweave::runtime::{load_document, load_glb, LoadedValue, TypeStore};
use sceneweave::Error;

static EXPORT_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

fn scene() -> SceneSource {
    SceneSource::new("Garden")
        .with(ExportableObject::node("1", "Garden").as_sub_asset())
        .with(
            ExportableObject::node("2", "Gate")
                .with_parent("1")
                .with_transform(Transform {
                    position: [1.0, 2.0, 3.0],
                    ..Transform::IDENTITY
                }),
        )
        .with(
            ExportableObject::component("3", "2", "Hinge")
                .with_module("./components/hinge")
                .with_field("target", Value::reference("4"))
                .with_field("leaves", Value::Array(vec![Value::reference("10"), Value::reference("10")])),
        )
        .with(ExportableObject::node("4", "Post").with_parent("1"))
        .with(ExportableObject::component("5", "4", "Renderer").with_field("material", Value::reference("10")))
        .with(ExportableObject::asset("10", "Material", "Wood"))
}

fn export(dir: &Path, settings: ExportSettings, source: SceneSource) {
    let graph = SceneGraph::from_source(source).expect("Invalid scene");
    let report = Exporter::new(ExportSettings {
        project_dir: dir.to_path_buf(),
        ..settings
    })
    .export_scene(&graph)
    .expect("Export run failed");
    assert!(report.is_success(), "{}", report.summary());
}

fn store(dir: &Path) -> TypeStore {
    TypeStore::from_manifest(dir.join("src/generated/register_types.ts")).expect("No manifest")
}

#[test]
fn test_shared_references_keep_topology() {
    let _lock = EXPORT_LOCK.lock();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    export(dir.path(), ExportSettings::default(), scene());

    let store = store(dir.path());
    assert_eq!(store.symbol("Hinge"), Some("Hinge"));
    assert!(store.contains("Renderer"));

    let text = fs::read_to_string(dir.path().join("assets/Garden.gltf")).expect("No output");
    let doc: serde_json::Value = serde_json::from_str(&text).expect("Output is not JSON");
    let scene = load_document(&doc, &store).expect("Load failed");

    let root = scene.root().expect("No root node");
    assert_eq!(root.name, "Garden");
    assert_eq!(root.children.len(), 2);

    let hinge = scene.objects().iter().find(|o| o.type_name == "Hinge").expect("No hinge");
    let renderer = scene.objects().iter().find(|o| o.type_name == "Renderer").expect("No renderer");

    let leaves = hinge.field("leaves").and_then(LoadedValue::as_array).expect("No leaves");
    let material = renderer.field("material").and_then(LoadedValue::handle).expect("Material not linked");
    assert_eq!(leaves[0].handle(), Some(material));
    assert_eq!(leaves[1].handle(), Some(material));
    assert_eq!(scene.objects().iter().filter(|o| o.type_name == "Material").count(), 1);

    let post = hinge.field("target").and_then(LoadedValue::handle).expect("Target not linked");
    assert_eq!(scene.get(post).map(|o| o.name.as_str()), Some("Post"));
    assert_eq!(renderer.parent, Some(post));
}

#[test]
fn test_binary_round_trip() {
    let _lock = EXPORT_LOCK.lock();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = ExportSettings {
        binary: true,
        ..ExportSettings::default()
    };
    export(dir.path(), settings, scene());

    let bytes = fs::read(dir.path().join("assets/Garden.glb")).expect("No GLB output");
    let scene = load_glb(&bytes, &store(dir.path())).expect("Load failed");
    assert_eq!(scene.objects().iter().filter(|o| o.type_name == "Material").count(), 1);
    assert_eq!(scene.relinked(), 4);
}

#[test]
fn test_missing_constructor_is_an_error() {
    let _lock = EXPORT_LOCK.lock();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    export(dir.path(), ExportSettings::default(), scene());

    let text = fs::read_to_string(dir.path().join("assets/Garden.gltf")).expect("No output");
    let doc: serde_json::Value = serde_json::from_str(&text).expect("Output is not JSON");
    let mut partial = TypeStore::new();
    partial.register("Renderer", "Renderer");

    let err = load_document(&doc, &partial).unwrap_err();
    assert!(matches!(err, Error::UnknownType { ref type_name, .. } if type_name == "Hinge"));
}

#[test]
fn test_identical_scenes_export_identical_bytes() {
    let _lock = EXPORT_LOCK.lock();
    let a = tempfile::tempdir().expect("Failed to create temp dir");
    let b = tempfile::tempdir().expect("Failed to create temp dir");
    export(a.path(), ExportSettings::default(), scene());

    // An unrelated root elsewhere in the scene keeps every identifier.
    let extended = scene().with(ExportableObject::node("99", "Shed"));
    export(b.path(), ExportSettings::default(), extended);

    let read = |dir: &Path, file: &str| fs::read(dir.join(file)).expect("Missing output");
    assert_eq!(read(a.path(), "assets/Garden.gltf"), read(b.path(), "assets/Garden.gltf"));
    assert_eq!(read(a.path(), "assets/scene_loader.ts"), read(b.path(), "assets/scene_loader.ts"));
}

#[test]
fn test_timeline_shared_by_two_directors() {
    let _lock = EXPORT_LOCK.lock();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let bindings: Value = serde_json::json!({ "Anim": { "$ref": "2" } }).into();
    let source = SceneSource::new("Stage")
        .with(ExportableObject::node("1", "Stage").as_sub_asset())
        .with(ExportableObject::node("2", "Actor").with_parent("1"))
        .with(
            ExportableObject::component("3", "1", "PlayableDirector")
                .with_field("playable", Value::reference("10"))
                .with_field("bindings", bindings),
        )
        .with(
            ExportableObject::component("4", "2", "PlayableDirector")
                .with_field("playable", Value::reference("10")),
        )
        .with(
            ExportableObject::asset("10", "TimelineAsset", "Intro")
                .with_field("duration", 3.0)
                .with_field("tracks", vec![Value::reference("11")]),
        )
        .with(ExportableObject::asset("11", "AnimationTrack", "Anim"));
    export(dir.path(), ExportSettings::default(), source);

    let text = fs::read_to_string(dir.path().join("assets/Stage.gltf")).expect("No output");
    let doc: serde_json::Value = serde_json::from_str(&text).expect("Output is not JSON");
    assert_eq!(doc["extensions"]["SCENE_objects"].as_object().map(|t| t.len()), Some(1));

    let scene = load_document(&doc, &store(dir.path())).expect("Load failed");
    let timelines: Vec<_> = scene.objects().iter().filter(|o| o.type_name == "TimelineAsset").collect();
    assert_eq!(timelines.len(), 1);

    let directors: Vec<_> = scene.objects().iter().filter(|o| o.type_name == "PlayableDirector").collect();
    assert_eq!(directors.len(), 2);
    let linked: Vec<_> = directors
        .iter()
        .map(|d| d.field("playable").and_then(|p| p.get("timeline")).and_then(LoadedValue::handle))
        .collect();
    assert!(linked[0].is_some());
    assert_eq!(linked[0], linked[1]);

    let actor = directors[0]
        .field("playable")
        .and_then(|p| p.get("outputs"))
        .and_then(|o| o.get("Anim"))
        .and_then(LoadedValue::handle)
        .expect("Bound output not linked");
    assert_eq!(scene.get(actor).map(|o| o.name.as_str()), Some("Actor"));
}
