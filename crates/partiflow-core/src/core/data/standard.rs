use super::property::PropertyDataType;
use phf::phf_map;

pub const POSITION: &str = "Position";
pub const SELECTION: &str = "Selection";
pub const COLOR: &str = "Color";
pub const PARTICLE_TYPE: &str = "Particle Type";
pub const RADIUS: &str = "Radius";
pub const CLUSTER: &str = "Cluster";
pub const IDENTIFIER: &str = "Identifier";

/// Names with a fixed meaning across all modifiers, mapped to the data type
/// every property of that name must have.
static STANDARD_PROPERTIES: phf::Map<&'static str, PropertyDataType> = phf_map! {
    "Position" => PropertyDataType::Vector3,
    "Selection" => PropertyDataType::Int,
    "Color" => PropertyDataType::Vector3,
    "Particle Type" => PropertyDataType::Int,
    "Bond Type" => PropertyDataType::Int,
    "Radius" => PropertyDataType::Float,
    "Mass" => PropertyDataType::Float,
    "Charge" => PropertyDataType::Float,
    "Velocity" => PropertyDataType::Vector3,
    "Force" => PropertyDataType::Vector3,
    "Cluster" => PropertyDataType::Int,
    "Identifier" => PropertyDataType::Int,
};

pub fn standard_data_type(name: &str) -> Option<PropertyDataType> {
    STANDARD_PROPERTIES.get(name).copied()
}

pub fn is_standard(name: &str) -> bool {
    STANDARD_PROPERTIES.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_names_resolve_to_fixed_types() {
        assert_eq!(standard_data_type(POSITION), Some(PropertyDataType::Vector3));
        assert_eq!(standard_data_type(SELECTION), Some(PropertyDataType::Int));
        assert_eq!(standard_data_type(RADIUS), Some(PropertyDataType::Float));
        assert_eq!(standard_data_type(CLUSTER), Some(PropertyDataType::Int));
    }

    #[test]
    fn lookup_is_case_sensitive_and_rejects_unknown_names() {
        assert!(!is_standard("position"));
        assert!(!is_standard("Temperature"));
        assert_eq!(standard_data_type(""), None);
    }
}
