use std::collections::HashMap;

use formats::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::analysis::Statistics;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// One row of the activity mapping file: a raw `sub-activity` string and the
/// land use category it rolls up to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCategory {
    pub activity: String,
    #[serde(rename = "sub-activity")]
    pub sub_activity: String,
}

/// Sets each parcel's `category` from the mapping entry whose sub-activity
/// equals the parcel's `activity`. Parcels with no activity, or an activity
/// the mapping lacks, are `Uncategorized`.
pub fn categorize_parcels(parcels: Vec<Feature>, mapping: &[ActivityCategory]) -> Vec<Feature> {
    let mut lookup: HashMap<&str, &str> = HashMap::with_capacity(mapping.len());
    for entry in mapping {
        lookup
            .entry(entry.sub_activity.as_str())
            .or_insert(entry.activity.as_str());
    }

    parcels
        .into_iter()
        .map(|mut parcel| {
            let category = match parcel.property_str("activity").filter(|a| !a.is_empty()) {
                None => UNCATEGORIZED.to_string(),
                Some(activity) => match lookup.get(activity) {
                    Some(category) => category.to_string(),
                    None => {
                        warn!(activity, "no category found for activity");
                        UNCATEGORIZED.to_string()
                    }
                },
            };
            parcel
                .properties
                .insert("category".to_string(), Value::String(category));
            parcel
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub acres: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandUseStatistics {
    pub total_acres: f64,
    pub categories: Vec<CategoryStats>,
}

fn categories_of(parcel: &Feature) -> Vec<&str> {
    parcel
        .property_str("category")
        .map(|c| c.split(", ").collect())
        .unwrap_or_default()
}

/// Acreage per land use category. A parcel whose category lists several
/// uses (`"Grazing, Oil and gas"`) counts toward each; percentages are of
/// the all-parcel total, so they can sum past 100.
pub fn land_use_statistics(parcels: &[Feature]) -> LandUseStatistics {
    let acres = |p: &Feature| p.property_f64("gis_acres").unwrap_or(0.0);
    let total_acres = Statistics::sum(parcels.iter().map(acres));

    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for parcel in parcels {
        for category in categories_of(parcel) {
            if !sums.contains_key(category) {
                order.push(category);
            }
            *sums.entry(category).or_insert(0.0) += acres(parcel);
        }
    }

    let categories = order
        .into_iter()
        .map(|category| {
            let acres = sums.get(category).copied().unwrap_or(0.0);
            CategoryStats {
                category: category.to_string(),
                acres,
                percent: Statistics::percent(acres, total_acres),
            }
        })
        .collect();

    LandUseStatistics {
        total_acres,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityCategory, UNCATEGORIZED, categorize_parcels, land_use_statistics};
    use formats::Feature;
    use serde_json::{Map, Value, json};

    fn parcel(props: Value) -> Feature {
        let Value::Object(map) = props else {
            panic!("props must be an object");
        };
        Feature::new(None, map)
    }

    #[test]
    fn mapping_parses_hyphenated_key() {
        let mapping: Vec<ActivityCategory> = serde_json::from_value(json!([
            {"activity": "Grazing", "sub-activity": "Grazing lease"}
        ]))
        .unwrap();
        assert_eq!(mapping[0].sub_activity, "Grazing lease");
    }

    #[test]
    fn assigns_categories_and_falls_back_to_uncategorized() {
        let mapping = vec![ActivityCategory {
            activity: "Fossil Fuels".to_string(),
            sub_activity: "Oil and gas lease".to_string(),
        }];
        let parcels = vec![
            parcel(json!({"activity": "Oil and gas lease"})),
            parcel(json!({"activity": "Mystery"})),
            parcel(json!({"activity": ""})),
            Feature::new(None, Map::new()),
        ];
        let out = categorize_parcels(parcels, &mapping);
        let cats: Vec<_> = out.iter().map(|p| p.property_str("category").unwrap()).collect();
        assert_eq!(cats, vec!["Fossil Fuels", UNCATEGORIZED, UNCATEGORIZED, UNCATEGORIZED]);
    }

    #[test]
    fn statistics_split_multi_use_categories() {
        let parcels = vec![
            parcel(json!({"category": "Grazing", "gis_acres": 100.0})),
            parcel(json!({"category": "Grazing, Timber", "gis_acres": 300.0})),
            parcel(json!({"category": "Timber"})),
        ];
        let stats = land_use_statistics(&parcels);
        assert_eq!(stats.total_acres, 400.0);
        assert_eq!(stats.categories.len(), 2);
        assert_eq!(stats.categories[0].category, "Grazing");
        assert_eq!(stats.categories[0].acres, 400.0);
        assert_eq!(stats.categories[0].percent, 100.0);
        assert_eq!(stats.categories[1].category, "Timber");
        assert_eq!(stats.categories[1].acres, 300.0);
        assert_eq!(stats.categories[1].percent, 75.0);
    }

    #[test]
    fn zero_total_gives_zero_percent() {
        let stats = land_use_statistics(&[parcel(json!({"category": "Grazing"}))]);
        assert_eq!(stats.total_acres, 0.0);
        assert_eq!(stats.categories[0].percent, 0.0);
    }
}
