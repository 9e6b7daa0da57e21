use crate::event::PropertyValue;
use crate::message::Item;

/// Flatten one named property into key/value items.
///
/// Dictionaries and structures recurse with `"{key}.{child}"` keys; every
/// other value produces a single item.
pub fn flatten(key: &str, value: Option<&PropertyValue>) -> Vec<Item> {
    let mut out = Vec::new();
    flatten_into(key, value, &mut out);
    out
}

fn flatten_into(key: &str, value: Option<&PropertyValue>, out: &mut Vec<Item>) {
    match value {
        None => out.push(Item::new(key, None)),
        Some(PropertyValue::Scalar(scalar)) => out.push(Item::new(key, scalar.raw_string())),
        Some(PropertyValue::Dictionary(entries)) => {
            for (element_key, element) in entries {
                let child = format!("{}.{}", key, element_key.raw_string().unwrap_or_default());
                flatten_into(&child, Some(element), out);
            }
        }
        Some(PropertyValue::Structure { properties, .. }) => {
            for (name, property) in properties {
                let child = format!("{}.{}", key, name);
                flatten_into(&child, Some(property), out);
            }
        }
        Some(other) => out.push(Item::new(key, Some(other.to_string()))),
    }
}

/// Flatten a property and join the values with `", "`, as used for
/// single-field lookups. Missing values join as empty strings.
pub fn flatten_to_string(key: &str, value: &PropertyValue) -> String {
    flatten(key, Some(value))
        .into_iter()
        .map(|item| item.value.unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}
