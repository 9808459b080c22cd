//! Data validation
//!
//! Column-count schema checks, per-column Kolmogorov-Smirnov drift detection
//! and the stage that runs both over the ingested splits.

pub mod drift;
pub mod schema;
mod validator;

pub use crate::config::OnValidationFailure;
pub use drift::{
    detect_drift, ColumnDrift, DriftReport, KolmogorovSmirnovTest, KsResult, DEFAULT_DRIFT_THRESHOLD,
};
pub use schema::{validate_columns, Schema, SchemaCheck};
pub use validator::DataValidation;
