use std::collections::HashMap;

use formats::Feature;
use tracing::debug;

use crate::property_key;
use crate::rights::{RIGHTS_TYPE, merge_rights, rights_types, rights_value};

/// Grouping key for a parcel: owning entity plus the flattened coordinate
/// string. `None` for parcels without geometry.
pub fn dedup_key(parcel: &Feature, entity_key: &str) -> Option<String> {
    let geometry = parcel.geometry.as_ref()?;
    let entity = parcel
        .property(entity_key)
        .map(property_key)
        .unwrap_or_else(|| "null".to_string());
    Some(format!("{entity} - {}", geometry.coordinate_key()))
}

enum Slot {
    Passthrough(Feature),
    Group {
        representative: Feature,
        rights: Vec<String>,
        members: usize,
    },
}

/// Collapses parcels that share an owning entity and identical geometry into
/// one parcel whose `rights_type` is the union of the group's rights.
///
/// The first parcel of each group is kept as the representative. Groups are
/// emitted in order of first appearance; parcels without geometry are
/// passed through untouched. Running this on its own output is a no-op.
pub fn deduplicate_parcels(parcels: Vec<Feature>, entity_key: &str) -> Vec<Feature> {
    let mut slots: Vec<Slot> = Vec::with_capacity(parcels.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for parcel in parcels {
        let Some(key) = dedup_key(&parcel, entity_key) else {
            slots.push(Slot::Passthrough(parcel));
            continue;
        };

        match index.get(&key) {
            Some(&i) => {
                if let Slot::Group {
                    rights, members, ..
                } = &mut slots[i]
                {
                    merge_rights(rights, rights_types(&parcel));
                    *members += 1;
                }
            }
            None => {
                index.insert(key, slots.len());
                slots.push(Slot::Group {
                    rights: rights_types(&parcel),
                    representative: parcel,
                    members: 1,
                });
            }
        }
    }

    let mut merged = 0usize;
    let out = slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Passthrough(feature) => feature,
            Slot::Group {
                representative,
                members: 1,
                ..
            } => representative,
            Slot::Group {
                mut representative,
                rights,
                members,
            } => {
                merged += members - 1;
                representative
                    .properties
                    .insert(RIGHTS_TYPE.to_string(), rights_value(&rights));
                representative
            }
        })
        .collect();

    debug!(merged, "deduplicated parcel geometries");
    out
}
