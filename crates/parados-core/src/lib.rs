//! Parados Core
//!
//! Feature schema, input validation and column alignment for the Canary
//! Islands unemployment model.
//!
//! - `schema`: the static `(internal name, alias)` field table and the
//!   mutual-exclusivity groups
//! - `validation`: per-field coercion and the exclusivity rules
//! - `record`: the validated, immutable [`FeatureRecord`]
//! - `columns`: the persisted [`ColumnOrder`] and single-row alignment
//! - `model`: the [`Model`] seam, a linear model loader and the
//!   process-wide [`ModelHandle`]
//!
//! ## Example
//!
//! ```rust
//! use parados_core::{ColumnOrder, FeatureRecord};
//!
//! let payload = serde_json::json!({
//!     "AÑO": 2020, "MES": 4, "I_Tenerife": true,
//!     "PIB_TOTAL": 43000.0, "CRISIS": false, "COVID": true
//! });
//! let record = FeatureRecord::from_json(&payload).unwrap();
//!
//! let order = ColumnOrder::new(vec!["MES".into(), "I_Tenerife".into()]).unwrap();
//! let row = order.align(&record).unwrap();
//! assert_eq!(row.numeric(), vec![4.0, 1.0]);
//! ```

pub mod columns;
pub mod error;
pub mod model;
pub mod record;
pub mod schema;
pub mod validation;

pub use columns::{ArtifactError, ColumnOrder, FeatureRow};
pub use error::PredictionError;
pub use model::{
    predict_scalar, LinearArtifact, LinearModel, Model, ModelError, ModelFuture, ModelHandle,
};
pub use record::FeatureRecord;
pub use schema::{ExclusiveGroup, FieldKind, FieldSpec, FIELDS};
pub use validation::{FieldIssue, FieldValue, ValidationFailure};
