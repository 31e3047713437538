//! Feature Module - tabular input rows for the preprocessor

pub mod value;
pub mod row;
pub mod assembler;

pub use value::FeatureValue;
pub use row::{ColumnKind, ColumnSpec, FeatureRow, FeatureSchema};
pub use assembler::{collect_fields, FeatureAssembler, PlaceholderFeatures, RawInputs};
