use formats::Feature;
use serde_json::Value;

/// Sections 16 and 36 of each township were granted to the states for
/// schools.
pub const SCHOOL_SECTIONS: [u32; 2] = [16, 36];

/// The section's first-division number, whether stored as a number or a
/// (possibly zero-padded) string.
pub fn section_number(feature: &Feature) -> Option<u32> {
    match feature.property("FRSTDIVNO")? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_school_section(feature: &Feature) -> bool {
    section_number(feature).is_some_and(|n| SCHOOL_SECTIONS.contains(&n))
}

/// Splits sections into (school trust sections, everything else).
pub fn partition_school_sections(sections: Vec<Feature>) -> (Vec<Feature>, Vec<Feature>) {
    sections.into_iter().partition(is_school_section)
}

#[cfg(test)]
mod tests {
    use super::{partition_school_sections, section_number};
    use formats::Feature;
    use serde_json::{Map, Value, json};

    fn section(no: Value) -> Feature {
        let mut props = Map::new();
        props.insert("FRSTDIVNO".to_string(), no);
        Feature::new(None, props)
    }

    #[test]
    fn reads_string_and_numeric_section_numbers() {
        assert_eq!(section_number(&section(json!("16"))), Some(16));
        assert_eq!(section_number(&section(json!("036"))), Some(36));
        assert_eq!(section_number(&section(json!(7))), Some(7));
        assert_eq!(section_number(&section(json!("A"))), None);
    }

    #[test]
    fn partitions_school_sections() {
        let (school, rest) = partition_school_sections(vec![
            section(json!("16")),
            section(json!("15")),
            section(json!(36)),
            Feature::default(),
        ]);
        assert_eq!(school.len(), 2);
        assert_eq!(rest.len(), 2);
    }
}
