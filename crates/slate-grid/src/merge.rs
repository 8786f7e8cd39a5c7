use serde_json::{Map, Value};

/// Overlays `overlay` onto `base`: nested objects merge key by key, anything
/// else in the overlay replaces what the base had.
pub fn merge(mut base: Value, overlay: &Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

pub fn merge_into(target: &mut Value, overlay: &Value) {
    let (Value::Object(target), Value::Object(overlay)) = (target, overlay) else {
        return;
    };
    for (key, value) in overlay {
        if value.is_object() {
            let slot = target
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            merge_into(slot, value);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}
