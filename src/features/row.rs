//! Feature schema and ordered feature rows

use serde::ser::{Serialize, SerializeMap, Serializer};
use super::value::FeatureValue;

/// How a declared input column is consumed by the preprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered input schema, discovered from the loaded preprocessor
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<ColumnSpec>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }
}

/// One tabular input row, ordered exactly like its schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    cells: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub(crate) fn from_cells(cells: Vec<(String, FeatureValue)>) -> Self {
        Self { cells }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v))
    }

}

// Serialized as a JSON object that keeps schema order
impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
