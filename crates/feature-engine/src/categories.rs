//! Canonical Category Lists
//!
//! The label order here is part of the model contract: a label's position is
//! fed to the regressor as a numeric feature, so the lists must be the exact
//! ones used when the artifacts were fitted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Index reported for a label that is not in its canonical list
pub const UNKNOWN_CATEGORY: i64 = -1;

/// Errors while loading or checking a category schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Category list '{0}' is empty")]
    EmptyList(&'static str),
    #[error("Category list '{list}' contains duplicate label '{label}'")]
    DuplicateLabel { list: &'static str, label: String },
}

/// Ordered list of labels for a label-encoded column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryList {
    labels: Vec<String>,
}

impl CategoryList {
    /// Create a list from labels in canonical order
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Zero-based position of `label`, or [`UNKNOWN_CATEGORY`] when absent
    pub fn index_of(&self, label: &str) -> i64 {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| i as i64)
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Whether `label` is a member of this list
    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn check(&self, list: &'static str) -> Result<(), SchemaError> {
        if self.labels.is_empty() {
            return Err(SchemaError::EmptyList(list));
        }
        let mut seen = HashSet::new();
        for label in &self.labels {
            if !seen.insert(label.as_str()) {
                return Err(SchemaError::DuplicateLabel {
                    list,
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Two-valued category expanded into a pair of indicator columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCategory {
    /// Label that sets the first indicator
    pub first: String,
    /// Label that sets the second indicator
    pub second: String,
}

impl BinaryCategory {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Indicator pair for `value`. Anything other than the two labels
    /// leaves both indicators at zero.
    pub fn one_hot(&self, value: &str) -> [f64; 2] {
        if value == self.first {
            [1.0, 0.0]
        } else if value == self.second {
            [0.0, 1.0]
        } else {
            [0.0, 0.0]
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        value == self.first || value == self.second
    }

    fn check(&self, list: &'static str) -> Result<(), SchemaError> {
        if self.first == self.second {
            return Err(SchemaError::DuplicateLabel {
                list,
                label: self.first.clone(),
            });
        }
        Ok(())
    }
}

/// Every canonical category list the encoder needs, in one place.
///
/// Shipped next to the model and scaler as `schema.json` so the fitting and
/// serving sides read the same lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
    /// Education levels, label-encoded into `Pendidikan`
    pub education_levels: CategoryList,
    /// Training majors, label-encoded into `Jurusan`
    pub majors: CategoryList,
    /// Gender, one-hot into `Jenis_Kelamin_*`
    pub gender: BinaryCategory,
    /// Employment status, one-hot into `Status_Bekerja_*`
    pub employment_status: BinaryCategory,
}

impl Default for CategorySchema {
    fn default() -> Self {
        Self {
            education_levels: CategoryList::new(["SMA", "SMK", "D3", "S1", "S2"]),
            majors: CategoryList::new([
                "Administrasi",
                "Desain Grafis",
                "Otomotif",
                "Teknik Las",
                "Teknik Listrik",
            ]),
            gender: BinaryCategory::new("Laki-laki", "Wanita"),
            employment_status: BinaryCategory::new("Belum Bekerja", "Sudah Bekerja"),
        }
    }
}

impl CategorySchema {
    /// Parse and check a schema from JSON text
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(text)?;
        schema.check()?;
        Ok(schema)
    }

    /// Load a schema file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let schema = Self::from_json(&text)?;
        debug!(
            "Loaded category schema from {}: {} education levels, {} majors",
            path.display(),
            schema.education_levels.len(),
            schema.majors.len()
        );
        Ok(schema)
    }

    /// Serialize for writing next to freshly fitted artifacts
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject empty lists and duplicate labels
    pub fn check(&self) -> Result<(), SchemaError> {
        self.education_levels.check("education_levels")?;
        self.majors.check("majors")?;
        self.gender.check("gender")?;
        self.employment_status.check("employment_status")
    }
}
