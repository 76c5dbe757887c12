//! Output writer contract and in-memory writer

use crate::operation::Operation;
use zonalite_core::{Feature, Result};

/// Destination for result features.
///
/// The processor announces the output schema through `add_operation`,
/// `add_column` and `add_geometry` before any feature is written. Format
/// backends live outside this workspace.
pub trait OutputWriter {
    /// Register the field(s) an operation will assign
    fn add_operation(&mut self, op: &Operation);

    /// Register a passthrough column copied from the input features
    fn add_column(&mut self, name: &str);

    /// Request that input geometries be carried into the output
    fn add_geometry(&mut self);

    /// Create an empty feature to be filled and written
    fn create_feature(&self) -> Feature {
        Feature::empty()
    }

    /// Write one result feature
    fn write(&mut self, feature: Feature) -> Result<()>;

    /// Flush any buffered state; called once after the last feature
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writer that collects results in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    columns: Vec<String>,
    include_geometry: bool,
    features: Vec<Feature>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered column names, passthrough columns first
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn includes_geometry(&self) -> bool {
        self.include_geometry
    }

    /// The features written so far
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Consume the writer and return the written features
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }
}

impl OutputWriter for MemoryWriter {
    fn add_operation(&mut self, op: &Operation) {
        for name in op.field_names() {
            self.columns.push(name.clone());
        }
    }

    fn add_column(&mut self, name: &str) {
        self.columns.push(name.to_string());
    }

    fn add_geometry(&mut self) {
        self.include_geometry = true;
    }

    fn write(&mut self, feature: Feature) -> Result<()> {
        self.features.push(feature);
        Ok(())
    }
}
