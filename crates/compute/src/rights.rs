use formats::Feature;
use serde_json::Value;

use crate::property_key;

pub const RIGHTS_TYPE: &str = "rights_type";

/// The parcel's rights types. A bare string counts as a one-element list;
/// a missing or null property yields an empty list.
pub fn rights_types(feature: &Feature) -> Vec<String> {
    match feature.property(RIGHTS_TYPE) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(property_key)
            .collect(),
        Some(other) => vec![property_key(other)],
    }
}

/// Appends each of `more` to `acc` unless already present. First-seen order
/// is kept.
pub fn merge_rights(acc: &mut Vec<String>, more: impl IntoIterator<Item = String>) {
    for right in more {
        if !acc.contains(&right) {
            acc.push(right);
        }
    }
}

pub fn rights_value(rights: &[String]) -> Value {
    Value::Array(rights.iter().cloned().map(Value::String).collect())
}

/// Rewrites a scalar `rights_type` as a one-element list so parcels holding
/// several rights can later share a single geometry. Lists and parcels
/// without the property are left alone.
pub fn arrayify_rights_type(features: Vec<Feature>) -> Vec<Feature> {
    features
        .into_iter()
        .map(|mut feature| {
            let scalar = match feature.properties.get(RIGHTS_TYPE) {
                None | Some(Value::Null) | Some(Value::Array(_)) => None,
                Some(other) => Some(other.clone()),
            };
            if let Some(value) = scalar {
                feature
                    .properties
                    .insert(RIGHTS_TYPE.to_string(), Value::Array(vec![value]));
            }
            feature
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{RIGHTS_TYPE, arrayify_rights_type, merge_rights, rights_types};
    use formats::Feature;
    use serde_json::{Map, Value, json};

    fn parcel(rights: Value) -> Feature {
        let mut props = Map::new();
        props.insert(RIGHTS_TYPE.to_string(), rights);
        Feature::new(None, props)
    }

    #[test]
    fn reads_scalar_and_list_rights() {
        assert_eq!(rights_types(&parcel(json!("surface"))), vec!["surface"]);
        assert_eq!(
            rights_types(&parcel(json!(["surface", "subsurface"]))),
            vec!["surface", "subsurface"]
        );
        assert!(rights_types(&parcel(Value::Null)).is_empty());
        assert!(rights_types(&Feature::default()).is_empty());
    }

    #[test]
    fn merge_keeps_first_seen_order_without_duplicates() {
        let mut acc = vec!["surface".to_string()];
        merge_rights(
            &mut acc,
            ["subsurface", "surface", "timber"].map(String::from),
        );
        assert_eq!(acc, vec!["surface", "subsurface", "timber"]);
    }

    #[test]
    fn arrayify_wraps_scalars_and_is_idempotent() {
        let parcels = vec![parcel(json!("subsurface")), parcel(json!(["surface"])), Feature::default()];
        let once = arrayify_rights_type(parcels);
        assert_eq!(once[0].property(RIGHTS_TYPE), Some(&json!(["subsurface"])));
        assert_eq!(once[1].property(RIGHTS_TYPE), Some(&json!(["surface"])));
        assert_eq!(once[2].property(RIGHTS_TYPE), None);

        let twice = arrayify_rights_type(once.clone());
        assert_eq!(twice, once);
    }
}
