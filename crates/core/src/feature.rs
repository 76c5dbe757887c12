//! Vector features: geometry plus named fields

use crate::error::{Error, Result};
use geo_types::Geometry;
use std::collections::{btree_map, BTreeMap};

/// A field value on a feature
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i32),
    Int64(i64),
    Double(f64),
    IntArray(Vec<i32>),
    Int64Array(Vec<i64>),
    DoubleArray(Vec<f64>),
}

/// The type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Int64,
    Double,
    IntArray,
    Int64Array,
    DoubleArray,
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::IntArray(_) => FieldType::IntArray,
            FieldValue::Int64Array(_) => FieldType::Int64Array,
            FieldValue::DoubleArray(_) => FieldType::DoubleArray,
        }
    }

    /// Length of an array value; scalars have length 1
    pub fn len(&self) -> usize {
        match self {
            FieldValue::IntArray(v) => v.len(),
            FieldValue::Int64Array(v) => v.len(),
            FieldValue::DoubleArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` of an array value as a scalar field value
    pub fn element(&self, i: usize) -> Option<FieldValue> {
        match self {
            FieldValue::IntArray(v) => v.get(i).map(|x| FieldValue::Int(*x)),
            FieldValue::Int64Array(v) => v.get(i).map(|x| FieldValue::Int64(*x)),
            FieldValue::DoubleArray(v) => v.get(i).map(|x| FieldValue::Double(*x)),
            other => Some(other.clone()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<Vec<i32>> for FieldValue {
    fn from(v: Vec<i32>) -> Self {
        FieldValue::IntArray(v)
    }
}

impl From<Vec<i64>> for FieldValue {
    fn from(v: Vec<i64>) -> Self {
        FieldValue::Int64Array(v)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(v: Vec<f64>) -> Self {
        FieldValue::DoubleArray(v)
    }
}

/// A geographic feature with optional geometry and named fields.
///
/// Fields keep a stable (sorted) order so generated columns appear in a
/// deterministic sequence.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    geometry: Option<Geometry<f64>>,
    fields: BTreeMap<String, FieldValue>,
}

impl Feature {
    /// Create a feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            fields: BTreeMap::new(),
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    pub fn set_geometry(&mut self, geometry: Option<Geometry<f64>>) {
        self.geometry = geometry;
    }

    /// Set a field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Type of a field, if present
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).map(FieldValue::field_type)
    }

    /// Iterate over fields in name order
    pub fn fields(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn get_string(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            FieldValue::String(v) => Ok(v),
            _ => Err(self.type_error(name, "string")),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v),
            _ => Err(self.type_error(name, "int32")),
        }
    }

    pub fn get_int64(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v as i64),
            FieldValue::Int64(v) => Ok(*v),
            _ => Err(self.type_error(name, "int64")),
        }
    }

    pub fn get_double(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v as f64),
            FieldValue::Int64(v) => Ok(*v as f64),
            FieldValue::Double(v) => Ok(*v),
            _ => Err(self.type_error(name, "double")),
        }
    }

    pub fn get_int_array(&self, name: &str) -> Result<&[i32]> {
        match self.require(name)? {
            FieldValue::IntArray(v) => Ok(v),
            _ => Err(self.type_error(name, "int_array")),
        }
    }

    pub fn get_int64_array(&self, name: &str) -> Result<&[i64]> {
        match self.require(name)? {
            FieldValue::Int64Array(v) => Ok(v),
            _ => Err(self.type_error(name, "int64_array")),
        }
    }

    pub fn get_double_array(&self, name: &str) -> Result<&[f64]> {
        match self.require(name)? {
            FieldValue::DoubleArray(v) => Ok(v),
            _ => Err(self.type_error(name, "double_array")),
        }
    }

    fn require(&self, name: &str) -> Result<&FieldValue> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    fn type_error(&self, name: &str, expected: &'static str) -> Error {
        Error::FieldType {
            field: name.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_set_get() {
        let mut f = Feature::empty();
        f.set("name", "parcel 7");
        f.set("pop", 1234.5);
        f.set("id", 42i64);

        assert_eq!(f.get_string("name").unwrap(), "parcel 7");
        assert_eq!(f.get_double("pop").unwrap(), 1234.5);
        assert_eq!(f.get_int64("id").unwrap(), 42);
        assert!(f.get("missing").is_none());
        assert!(f.get_double("name").is_err());
    }

    #[test]
    fn test_field_types() {
        let mut f = Feature::empty();
        f.set("a", vec![1.0, 2.0]);
        f.set("b", 3);

        assert_eq!(f.field_type("a"), Some(FieldType::DoubleArray));
        assert_eq!(f.field_type("b"), Some(FieldType::Int));
        assert_eq!(f.field_type("c"), None);

        assert_eq!(f.get("a").unwrap().len(), 2);
        assert_eq!(f.get("b").unwrap().len(), 1);
        assert_eq!(
            f.get("a").unwrap().element(1),
            Some(FieldValue::Double(2.0))
        );
    }

    #[test]
    fn test_geometry() {
        let geom = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
        ]);
        let f = Feature::new(geom);
        assert!(f.geometry().is_some());
        assert!(Feature::empty().geometry().is_none());
    }
}
