use std::collections::BTreeMap;

use super::chain::ValueResolver;
use crate::core::{ExportableObject, Value};
use crate::emit::Serializer;

/// Signal receivers: `events` becomes `[{signal: {guid}, reaction}]`.
///
/// Signals are matched by identifier at runtime, so the signal asset itself
/// is not exported; events whose signal is gone are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalReceiverResolver;

impl ValueResolver for SignalReceiverResolver {
    fn name(&self) -> &'static str {
        "signal_receiver"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn try_resolve(
        &self,
        ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool {
        if instance.type_name != "SignalReceiver" || member != "events" {
            return false;
        }
        let Some(events) = value.as_array() else {
            return false;
        };

        let graph = ser.graph();
        let mut resolved = Vec::with_capacity(events.len());
        for event in events {
            let signal = event
                .get("signal")
                .and_then(Value::as_ref_key)
                .and_then(|k| graph.get(k))
                .filter(|s| !s.destroyed);
            let Some(guid) = signal.and_then(|s| ser.id_of(s)) else {
                ser.warn(format!("{}: signal event without a live signal asset", instance.name));
                continue;
            };
            let reaction = event.get("reaction").cloned().unwrap_or(Value::Null);
            resolved.push(Value::Map(BTreeMap::from([
                (
                    "signal".to_string(),
                    Value::Map(BTreeMap::from([("guid".to_string(), Value::Str(guid.to_string()))])),
                ),
                ("reaction".to_string(), reaction),
            ])));
        }

        *value = Value::Array(resolved);
        true
    }
}
