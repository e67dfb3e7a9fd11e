//! Type-info tables describing how a build lays out its values.
//!
//! A protocol definition is a flat list of [`TypeInfo`] entries addressed by
//! index ("typeid"). Composite entries refer to other entries by typeid.
//!
//! In JSON each entry is tagged by `type`:
//!
//! ```json
//! {"type": "int", "bounds": [0, 7]}
//! {"type": "choice", "bounds": [0, 2], "fields": [[0, "m_uint6", 3]]}
//! {"type": "struct", "fields": [["m_userId", 2, -1]]}
//! ```

use serde::Deserialize;

/// Integer range as `(offset, bit width)`: a bit-packed value is the offset
/// plus the next `bit width` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Bounds(pub i64, pub u32);

/// Struct member as `(name, typeid, tag)`. The tag matches fields in
/// versioned data; bit-packed data relies on declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldInfo(pub String, pub usize, pub i64);

/// Choice alternative as `(tag, name, typeid)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoiceField(pub i64, pub String, pub usize);

/// Struct member name whose value is merged into the enclosing struct.
pub const PARENT_FIELD: &str = "__parent";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeInfo {
    Int {
        bounds: Bounds,
    },
    Bool,
    Blob {
        bounds: Bounds,
    },
    #[serde(rename = "bitarray")]
    BitArray {
        bounds: Bounds,
    },
    Array {
        bounds: Bounds,
        typeid: usize,
    },
    Choice {
        bounds: Bounds,
        fields: Vec<ChoiceField>,
    },
    Optional {
        typeid: usize,
    },
    Struct {
        fields: Vec<FieldInfo>,
    },
    #[serde(rename = "fourcc")]
    FourCC,
    Real32,
    Real64,
    Null,
}

impl TypeInfo {
    /// Typeids this entry refers to.
    pub fn children(&self) -> Vec<usize> {
        match self {
            TypeInfo::Array { typeid, .. } | TypeInfo::Optional { typeid } => vec![*typeid],
            TypeInfo::Choice { fields, .. } => fields.iter().map(|f| f.2).collect(),
            TypeInfo::Struct { fields } => fields.iter().map(|f| f.1).collect(),
            _ => Vec::new(),
        }
    }
}

impl ChoiceField {
    pub fn tag(&self) -> i64 {
        self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }

    pub fn typeid(&self) -> usize {
        self.2
    }
}

impl FieldInfo {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn typeid(&self) -> usize {
        self.1
    }

    pub fn tag(&self) -> i64 {
        self.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_kind() {
        let infos: Vec<TypeInfo> = serde_json::from_str(
            r#"[
                {"type": "int", "bounds": [0, 7]},
                {"type": "bool"},
                {"type": "blob", "bounds": [0, 8]},
                {"type": "bitarray", "bounds": [0, 6]},
                {"type": "array", "bounds": [0, 5], "typeid": 0},
                {"type": "choice", "bounds": [0, 2], "fields": [[0, "m_uint6", 0], [1, "m_uint14", 0]]},
                {"type": "optional", "typeid": 1},
                {"type": "struct", "fields": [["m_userId", 0, -1]]},
                {"type": "fourcc"},
                {"type": "real32"},
                {"type": "real64"},
                {"type": "null"}
            ]"#,
        )
        .unwrap();

        assert_eq!(infos.len(), 12);
        assert_eq!(infos[0], TypeInfo::Int { bounds: Bounds(0, 7) });
        assert_eq!(infos[3], TypeInfo::BitArray { bounds: Bounds(0, 6) });
        assert_eq!(infos[8], TypeInfo::FourCC);
        assert_eq!(infos[5].children(), vec![0, 0]);
        assert_eq!(
            infos[7],
            TypeInfo::Struct {
                fields: vec![FieldInfo("m_userId".into(), 0, -1)]
            }
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(serde_json::from_str::<TypeInfo>(r#"{"type": "float"}"#).is_err());
    }
}
