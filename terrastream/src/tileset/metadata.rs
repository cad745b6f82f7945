//! Passive metadata value objects from the `3DTILES_metadata`
//! extension.
//!
//! These are read-only inputs: the engine attaches them to tilesets
//! but never constructs or validates them beyond existence checks.

use std::collections::HashMap;

use serde::Deserialize;

/// The `3DTILES_metadata` extension payload at tileset level.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TilesetMetadataExt {
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
    #[serde(default)]
    pub groups: Vec<GroupMetadata>,
    /// Metadata about the tileset itself.
    #[serde(default)]
    pub tileset: Option<MetadataEntity>,
}

/// A class/enum schema.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Schema {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: HashMap<String, Class>,
    #[serde(default)]
    pub enums: HashMap<String, EnumDef>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Class {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, ClassProperty>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClassProperty {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub property_type: Option<String>,
    #[serde(default, rename = "componentType")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnumDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// Per-class statistics.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Statistics {
    #[serde(default)]
    pub classes: HashMap<String, ClassStatistics>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClassStatistics {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// A metadata entity: a class reference plus property values.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetadataEntity {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Group metadata an overlay or content may reference.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GroupMetadata {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}
