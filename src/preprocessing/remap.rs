//! Legacy category label remapping
//!
//! Historical datasets use older labels for some categorical fields. A remap
//! rewrites them to the current vocabulary before classification and again
//! before every transform, so training and serving see the same categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::table::{ColumnData, FieldValue, Record, Table};

/// Label rewrite table for one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRemap {
    pub field: String,
    pub mapping: BTreeMap<String, String>,
}

impl LabelRemap {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            mapping: BTreeMap::new(),
        }
    }

    /// Builder method to add one `from -> to` rewrite
    pub fn with(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mapping.insert(from.into(), to.into());
        self
    }

    /// Legacy `Condition` labels: Excellent/Fair/Good/Poor onto
    /// New/Good/Needs Renovation.
    pub fn condition() -> Self {
        Self::new("Condition")
            .with("Excellent", "New")
            .with("Fair", "Good")
            .with("Good", "Good")
            .with("Poor", "Needs Renovation")
    }

    /// Rewrite a single label; labels without an entry pass through.
    pub fn apply<'a>(&'a self, value: &'a str) -> &'a str {
        self.mapping.get(value).map(String::as_str).unwrap_or(value)
    }

    /// Rewrite the field's column in place. Numeric columns are untouched.
    pub fn apply_table(&self, table: &mut Table) -> usize {
        let mut rewritten = 0;
        if let Some(ColumnData::Categorical(values)) = table.column_mut(&self.field) {
            for value in values.iter_mut().flatten() {
                if let Some(target) = self.mapping.get(value.as_str()) {
                    if *target != *value {
                        rewritten += 1;
                    }
                    *value = target.clone();
                }
            }
        }
        rewritten
    }

    /// Rewrite the field of a single record in place
    pub fn apply_record(&self, record: &mut Record) {
        if let Some(FieldValue::Text(value)) = record.get(&self.field) {
            let mapped = self.apply(value).to_string();
            record.insert(self.field.clone(), FieldValue::Text(mapped));
        }
    }
}
