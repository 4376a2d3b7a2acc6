//! Shared timeline model.
//!
//! A `TimelineAsset` is interned once into the shared-object table as a
//! portable model: its duration and its tracks with clips and the outputs the
//! tracks declare themselves. Each reference to it becomes
//! `{timeline: {"$ref": id}, outputs: {track: bound}}`, where `outputs` holds
//! the referencing director's `bindings` for the timeline's tracks.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use super::chain::ValueResolver;
use crate::core::{ExportableObject, SceneGraph, Value};
use crate::emit::Serializer;
use crate::registry::FieldPath;

pub const TIMELINE_TYPE: &str = "TimelineAsset";

#[derive(Debug, Default, Clone, Copy)]
pub struct TimelineResolver;

impl TimelineResolver {
    fn track(graph: &SceneGraph, entry: &Value) -> Option<(String, Value)> {
        // Tracks are either assets of their own or inline maps.
        let (name, type_name, fields) = match entry {
            Value::Ref(key) => {
                let track = graph.get(key).filter(|t| !t.destroyed)?;
                (track.name.clone(), track.type_name.clone(), &track.fields)
            }
            Value::Map(map) => (
                map.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                map.get("type").and_then(Value::as_str).unwrap_or("Track").to_string(),
                map,
            ),
            _ => return None,
        };

        let outputs = fields
            .get("outputs")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let clips = fields
            .get("clips")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let muted = fields.get("muted").and_then(Value::as_bool).unwrap_or(false);

        let model = Value::Map(BTreeMap::from([
            ("name".to_string(), Value::Str(name.clone())),
            ("type".to_string(), Value::Str(type_name)),
            ("muted".to_string(), Value::Bool(muted)),
            ("clips".to_string(), clips),
            ("outputs".to_string(), outputs),
        ]));
        Some((name, model))
    }

    fn tracks(graph: &SceneGraph, timeline: &ExportableObject) -> Vec<(String, Value)> {
        timeline
            .field("tracks")
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(|t| Self::track(graph, t))
            .collect()
    }
}

impl ValueResolver for TimelineResolver {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn try_resolve(
        &self,
        ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool {
        let graph = ser.graph();
        let Some((key, timeline)) = value
            .as_ref_key()
            .and_then(|k| graph.get(k).map(|t| (k.clone(), t)))
            .filter(|(_, t)| t.type_name == TIMELINE_TYPE && !t.destroyed)
        else {
            return false;
        };
        let Some(id) = ser.id_of(timeline) else {
            return false;
        };
        let tracks = Self::tracks(graph, timeline);

        ser.intern_model(timeline, &id, |ser| {
            let path = FieldPath::new(id.clone());
            let duration = timeline.field("duration").and_then(Value::as_f64).unwrap_or(0.0);
            let models: Vec<Value> = tracks.iter().map(|(_, m)| m.clone()).collect();
            let tracks_json = ser.serialize_value(&path.field("tracks"), &Value::Array(models));

            let mut fields = Map::new();
            fields.insert("duration".into(), Json::from(duration));
            fields.insert("tracks".into(), tracks_json);
            fields
        });

        let bindings = instance.field("bindings").and_then(Value::as_map);
        let outputs: BTreeMap<String, Value> = tracks
            .iter()
            .filter_map(|(name, _)| Some((name.clone(), bindings?.get(name)?.clone())))
            .collect();
        tracing::debug!(
            "{}.{member}: timeline '{}' shared as {id} ({} tracks)",
            instance.name,
            timeline.name,
            tracks.len()
        );

        *value = Value::Map(BTreeMap::from([
            ("timeline".to_string(), Value::Ref(key)),
            ("outputs".to_string(), Value::Map(outputs)),
        ]));
        true
    }
}
