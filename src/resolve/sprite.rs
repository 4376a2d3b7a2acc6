//! Sprite references and per-texture sprite sheets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::json;

use super::chain::ValueResolver;
use crate::core::{ExportableObject, SourceKey, Value};
use crate::emit::Serializer;
use crate::extension::{ExtensionBlock, ExtensionTarget, SPRITE_SHEET_EXTENSION};

pub const SPRITE_TYPE: &str = "Sprite";

/// Replaces a sprite reference with `{guid, index, texture}` and keeps a
/// `SPRITE_sheet` block on the texture listing every sprite seen so far.
#[derive(Debug, Default)]
pub struct SpriteSheetResolver {
    serializing: AtomicBool,
    /// Texture key to the sprites placed on it, in sheet order.
    sheets: Mutex<HashMap<SourceKey, Vec<SourceKey>>>,
}

/// Clears the serializing flag on drop.
struct Serializing<'a>(&'a AtomicBool);

impl<'a> Serializing<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for Serializing<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn sheet_entry(sprite: &ExportableObject) -> serde_json::Value {
    let floats = |name: &str, len: usize| -> Vec<f64> {
        let mut out: Vec<f64> = sprite
            .field(name)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();
        out.resize(len, 0.0);
        out
    };
    let ppu = sprite
        .field("pixels_per_unit")
        .and_then(Value::as_f64)
        .unwrap_or(100.0);
    json!({
        "name": sprite.name,
        "rect": floats("rect", 4),
        "pivot": floats("pivot", 2),
        "pixelsPerUnit": ppu,
    })
}

impl ValueResolver for SpriteSheetResolver {
    fn name(&self) -> &'static str {
        "sprite_sheet"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn try_resolve(
        &self,
        ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool {
        let graph = ser.graph();
        let Some(sprite) = value
            .as_ref_key()
            .and_then(|k| graph.get(k))
            .filter(|s| s.type_name == SPRITE_TYPE && !s.destroyed)
        else {
            return false;
        };
        let Some(_guard) = Serializing::enter(&self.serializing) else {
            return false;
        };

        let texture = sprite
            .field("texture")
            .and_then(Value::as_ref_key)
            .and_then(|k| graph.get(k))
            .filter(|t| !t.destroyed);
        let (Some(texture), Some(sprite_id)) = (texture, ser.id_of(sprite)) else {
            ser.warn(format!("sprite '{}' has no texture; exported as a plain asset", sprite.name));
            return false;
        };
        let Some(texture_id) = ser.id_of(texture) else {
            return false;
        };

        let (index, entries) = {
            let mut sheets = self.sheets.lock();
            let sheet = sheets.entry(texture.key.clone()).or_default();
            let index = match sheet.iter().position(|k| k == &sprite.key) {
                Some(i) => i,
                None => {
                    sheet.push(sprite.key.clone());
                    sheet.len() - 1
                }
            };
            let entries: Vec<serde_json::Value> = sheet
                .iter()
                .filter_map(|k| graph.get(k))
                .map(sheet_entry)
                .collect();
            (index, entries)
        };
        ser.cx().extensions.attach(
            ExtensionTarget::Texture(texture_id),
            ExtensionBlock::new(SPRITE_SHEET_EXTENSION, 1, json!({ "sprites": entries })),
        );

        // Re-enters the serializer for the texture; a sprite reachable from
        // the texture's own fields is then serialized as a plain reference.
        let path = ser.member_path(instance, member).field("texture");
        let texture_json = ser.reference(&path, &texture.key);

        *value = Value::Resolved(json!({
            "guid": sprite_id,
            "index": index,
            "texture": texture_json,
        }));
        true
    }

    fn reset(&self) {
        self.sheets.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SceneGraph, SceneSource, REF_KEY};
    use crate::resolve::testing::with_serializer;

    fn graph() -> SceneGraph {
        let rect: Value = serde_json::json!([0, 0, 32, 32]).into();
        SceneGraph::from_source(
            SceneSource::new("S")
                .with(ExportableObject::node("1", "Hud"))
                .with(
                    ExportableObject::component("2", "1", "Image")
                        .with_field("sprite", Value::reference("10"))
                        .with_field("other", Value::reference("11"))
                        .with_field("orphan", Value::reference("12")),
                )
                .with(
                    ExportableObject::asset("10", SPRITE_TYPE, "Heart")
                        .with_field("texture", Value::reference("20"))
                        .with_field("rect", rect),
                )
                .with(ExportableObject::asset("11", SPRITE_TYPE, "Star").with_field("texture", Value::reference("20")))
                .with(ExportableObject::asset("12", SPRITE_TYPE, "Lost"))
                .with(ExportableObject::asset("20", "Texture2D", "Atlas").with_field("back", Value::reference("10"))),
        )
        .unwrap()
    }

    #[test]
    fn test_sheet_built_on_texture() {
        let g = graph();
        let image = g.by_key("2").unwrap();
        let resolver = SpriteSheetResolver::default();
        let mut a = Value::reference("10");
        let mut b = Value::reference("11");
        let ((ra, rb), cx) = with_serializer(&g, |ser| {
            let ra = resolver.try_resolve(ser, image, "sprite", &mut a);
            let rb = resolver.try_resolve(ser, image, "other", &mut b);
            (ra, rb)
        });
        assert!(ra && rb);

        let Value::Resolved(json) = &b else { panic!("expected resolved sprite") };
        assert_eq!(json["index"], 1);
        assert!(json["texture"].get(REF_KEY).is_some());

        let texture_id = cx
            .registry
            .references()
            .iter()
            .find(|r| r.path.member() == Some("other"))
            .map(|r| r.target.clone())
            .unwrap();
        let block = &cx.extensions.blocks_for(&ExtensionTarget::Texture(texture_id))[0];
        assert_eq!(block.name, SPRITE_SHEET_EXTENSION);
        assert_eq!(block.payload["sprites"].as_array().unwrap().len(), 2);
        assert_eq!(block.payload["sprites"][0]["rect"], serde_json::json!([0.0, 0.0, 32.0, 32.0]));

        // Flag is released after each resolution.
        assert!(!resolver.serializing.load(Ordering::Acquire));
    }

    #[test]
    fn test_ineligible_sprite_falls_through() {
        let g = graph();
        let image = g.by_key("2").unwrap();
        let resolver = SpriteSheetResolver::default();
        let mut value = Value::reference("12");
        let (applied, cx) = with_serializer(&g, |ser| resolver.try_resolve(ser, image, "orphan", &mut value));
        assert!(!applied);
        assert_eq!(value, Value::reference("12"));
        assert_eq!(cx.diagnostics().len(), 1);
    }

    #[test]
    fn test_reentry_is_refused() {
        let g = graph();
        let image = g.by_key("2").unwrap();
        let resolver = SpriteSheetResolver::default();
        let _held = Serializing::enter(&resolver.serializing).unwrap();
        let mut value = Value::reference("10");
        let (applied, _) = with_serializer(&g, |ser| resolver.try_resolve(ser, image, "sprite", &mut value));
        assert!(!applied);
    }

    #[test]
    fn test_reset_clears_sheets() {
        let g = graph();
        let image = g.by_key("2").unwrap();
        let resolver = SpriteSheetResolver::default();
        let mut value = Value::reference("11");
        with_serializer(&g, |ser| resolver.try_resolve(ser, image, "other", &mut value));
        resolver.reset();
        let mut value = Value::reference("10");
        with_serializer(&g, |ser| resolver.try_resolve(ser, image, "sprite", &mut value));
        let Value::Resolved(json) = &value else { panic!("expected resolved sprite") };
        assert_eq!(json["index"], 0);
    }
}
