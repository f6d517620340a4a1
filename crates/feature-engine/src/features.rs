//! Feature Vector Assembly

use crate::categories::CategorySchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of columns the scaler and regressor were fitted on
pub const FEATURE_DIMENSION: usize = 9;

/// Training-time column names, in model order
pub const FEATURE_COLUMNS: [&str; FEATURE_DIMENSION] = [
    "Usia",
    "Durasi_Jam",
    "Nilai_Ujian",
    "Pendidikan",
    "Jurusan",
    "Jenis_Kelamin_Laki-laki",
    "Jenis_Kelamin_Wanita",
    "Status_Bekerja_Belum Bekerja",
    "Status_Bekerja_Sudah Bekerja",
];

/// Raw form values for one training participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInput {
    /// Age in years
    #[serde(alias = "Usia")]
    pub age: u32,
    /// Training duration in hours
    #[serde(alias = "Durasi_Jam")]
    pub training_duration_hours: f64,
    /// Final exam score
    #[serde(alias = "Nilai_Ujian")]
    pub exam_score: f64,
    /// Education level label (e.g. "S1")
    #[serde(alias = "Pendidikan")]
    pub education_level: String,
    /// Training major label
    #[serde(alias = "Jurusan")]
    pub major: String,
    #[serde(alias = "Jenis_Kelamin")]
    pub gender: String,
    #[serde(alias = "Status_Bekerja")]
    pub employment_status: String,
}

/// Unscaled feature row in [`FEATURE_COLUMNS`] order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a column by its training name
    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i])
    }

    /// (column name, value) pairs in model order
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_COLUMNS.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        FEATURE_DIMENSION
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_DIMENSION],
        }
    }
}

/// Encodes participant inputs against a fixed category schema.
///
/// Encoding is total: unknown education or major labels become `-1`, and an
/// unrecognized gender or employment value leaves both indicators at zero.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    schema: CategorySchema,
}

impl FeatureEncoder {
    /// Create an encoder bound to `schema`
    pub fn new(schema: CategorySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CategorySchema {
        &self.schema
    }

    /// Build the unscaled feature row for `input`
    pub fn encode(&self, input: &ParticipantInput) -> FeatureVector {
        let gender = self.schema.gender.one_hot(&input.gender);
        let employment = self.schema.employment_status.one_hot(&input.employment_status);

        let values = [
            input.age as f64,
            input.training_duration_hours,
            input.exam_score,
            self.schema.education_levels.index_of(&input.education_level) as f64,
            self.schema.majors.index_of(&input.major) as f64,
            gender[0],
            gender[1],
            employment[0],
            employment[1],
        ];

        debug!("Encoded participant input: {:?}", values);
        FeatureVector { values }
    }
}
