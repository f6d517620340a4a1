//! Feature Engineering Engine
//!
//! Turns a training participant's form values into the fixed, ordered
//! feature row the salary model was fitted on.

mod categories;
mod features;

pub use categories::{BinaryCategory, CategoryList, CategorySchema, SchemaError, UNKNOWN_CATEGORY};
pub use features::{
    FeatureEncoder, FeatureVector, ParticipantInput, FEATURE_COLUMNS, FEATURE_DIMENSION,
};
