//! Serde helpers for glam vectors.
//!
//! Vectors are written as plain `[x, y, z]` arrays so scenario files stay
//! short: `center: [0.5, 0.5, 0.5]`.

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Use with `#[serde(with = "crate::serde_utils::vec3")]`.
pub mod vec3 {
    use super::*;

    pub fn serialize<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        v.to_array().serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[f32; 3]>::deserialize(d).map(Vec3::from_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Holder {
        #[serde(with = "vec3")]
        v: Vec3,
    }

    #[test]
    fn test_vec3_as_array() {
        let h = Holder {
            v: Vec3::new(1.0, -2.5, 0.25),
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"v":[1.0,-2.5,0.25]}"#);
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
