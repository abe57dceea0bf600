//! Feature group detection

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::OrdinalFeature;
use super::table::{ColumnData, Table};

/// Which transform recipe a feature group uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureGroup {
    Numeric,
    Nominal,
    Ordinal,
}

impl FeatureGroup {
    /// Prefix used in generated feature names
    pub fn prefix(&self) -> &'static str {
        match self {
            FeatureGroup::Numeric => "num",
            FeatureGroup::Nominal => "cat",
            FeatureGroup::Ordinal => "ord",
        }
    }
}

/// Disjoint field groups, each in schema column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    pub numeric: Vec<String>,
    pub nominal: Vec<String>,
    pub ordinal: Vec<OrdinalFeature>,
}

impl FeatureGroups {
    pub fn group_of(&self, field: &str) -> Option<FeatureGroup> {
        if self.numeric.iter().any(|f| f == field) {
            Some(FeatureGroup::Numeric)
        } else if self.nominal.iter().any(|f| f == field) {
            Some(FeatureGroup::Nominal)
        } else if self.ordinal.iter().any(|f| f.name == field) {
            Some(FeatureGroup::Ordinal)
        } else {
            None
        }
    }

    /// Nominal and ordinal field names
    pub fn categorical(&self) -> Vec<String> {
        self.nominal
            .iter()
            .cloned()
            .chain(self.ordinal.iter().map(|f| f.name.clone()))
            .collect()
    }

    pub fn n_fields(&self) -> usize {
        self.numeric.len() + self.nominal.len() + self.ordinal.len()
    }
}

/// Splits table columns into numeric, nominal and ordinal groups
#[derive(Debug, Clone)]
pub struct FeatureClassifier {
    ordinal_features: Vec<OrdinalFeature>,
}

impl FeatureClassifier {
    pub fn new(ordinal_features: Vec<OrdinalFeature>) -> Self {
        Self { ordinal_features }
    }

    /// Classify every column of `table`.
    ///
    /// Numeric columns are numeric. Text columns are nominal unless the
    /// ordinal table names them, in which case they take the declared rank
    /// order. Declared ordinal fields missing from the table are skipped.
    pub fn classify(&self, table: &Table) -> FeatureGroups {
        let mut groups = FeatureGroups::default();

        for (name, data) in table.iter() {
            let ordinal = self.ordinal_features.iter().find(|f| f.name == name);
            match (data, ordinal) {
                (ColumnData::Categorical(_), Some(feature)) => {
                    groups.ordinal.push(feature.clone());
                }
                (ColumnData::Numeric(_), Some(_)) => {
                    warn!(field = %name, "Ordinal field has a numeric column, keeping it numeric");
                    groups.numeric.push(name.to_string());
                }
                (ColumnData::Numeric(_), None) => groups.numeric.push(name.to_string()),
                (ColumnData::Categorical(_), None) => groups.nominal.push(name.to_string()),
            }
        }

        for feature in &self.ordinal_features {
            if !table.has_column(&feature.name) {
                debug!(field = %feature.name, "Declared ordinal field not present, skipping");
            }
        }

        groups
    }
}
