//! Fitted column transformer
//!
//! Maps a schema-ordered [`FeatureRow`] to the numeric vector the classifier
//! consumes. Transformer outputs are concatenated in declaration order;
//! declared columns no transformer names are dropped.

use ndarray::Array1;
use serde::Deserialize;

use crate::features::{ColumnKind, ColumnSpec, FeatureRow, FeatureSchema, FeatureValue};

use super::error::InferenceError;

/// On-disk form of the fitted preprocessor
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessorSpec {
    pub feature_names_in: Vec<String>,
    pub transformers: Vec<TransformerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformerSpec {
    StandardScaler {
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    MinMaxScaler {
        columns: Vec<String>,
        min: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        columns: Vec<String>,
        categories: Vec<Vec<FeatureValue>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Passthrough {
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

#[derive(Debug, Clone)]
enum Step {
    /// `(x - offset) / divisor` per column
    Affine { columns: Vec<usize>, offset: Vec<f64>, divisor: Vec<f64> },
    /// `x * factor + shift` per column
    MinMax { columns: Vec<usize>, factor: Vec<f64>, shift: Vec<f64> },
    OneHot { columns: Vec<usize>, categories: Vec<Vec<String>>, handle_unknown: HandleUnknown },
    Passthrough { columns: Vec<usize> },
}

impl Step {
    fn width(&self) -> usize {
        match self {
            Step::Affine { columns, .. } | Step::MinMax { columns, .. } | Step::Passthrough { columns } => columns.len(),
            Step::OneHot { categories, .. } => categories.iter().map(Vec::len).sum(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: FeatureSchema,
    steps: Vec<Step>,
    output_width: usize,
}

impl Preprocessor {
    /// Validate the fitted parameters and resolve column positions
    pub fn from_spec(spec: PreprocessorSpec) -> Result<Self, String> {
        if spec.feature_names_in.is_empty() {
            return Err("feature_names_in is empty".to_string());
        }
        for (i, name) in spec.feature_names_in.iter().enumerate() {
            if spec.feature_names_in[..i].contains(name) {
                return Err(format!("duplicate input column `{}`", name));
            }
        }

        let position = |name: &String| -> Result<usize, String> {
            spec.feature_names_in
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| format!("transformer column `{}` is not in feature_names_in", name))
        };
        let positions = |names: &[String]| names.iter().map(position).collect::<Result<Vec<_>, _>>();
        let check_len = |what: &str, got: usize, expected: usize| {
            if got == expected {
                Ok(())
            } else {
                Err(format!("{} has {} entries, expected {}", what, got, expected))
            }
        };

        let mut kinds = vec![None; spec.feature_names_in.len()];
        let mut mark = |columns: &[usize], kind: ColumnKind| -> Result<(), String> {
            for &c in columns {
                match kinds[c] {
                    Some(existing) if existing != kind => {
                        return Err(format!(
                            "column `{}` is used as both numeric and categorical",
                            spec.feature_names_in[c]
                        ))
                    }
                    _ => kinds[c] = Some(kind),
                }
            }
            Ok(())
        };

        let mut steps = Vec::with_capacity(spec.transformers.len());
        for transformer in &spec.transformers {
            let step = match transformer {
                TransformerSpec::StandardScaler { columns, mean, scale } => {
                    check_len("standard_scaler.mean", mean.len(), columns.len())?;
                    check_len("standard_scaler.scale", scale.len(), columns.len())?;
                    if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                        return Err("standard_scaler.scale must be positive".to_string());
                    }
                    let columns = positions(columns)?;
                    mark(&columns, ColumnKind::Numeric)?;
                    Step::Affine { columns, offset: mean.clone(), divisor: scale.clone() }
                }
                TransformerSpec::MinMaxScaler { columns, min, scale } => {
                    check_len("min_max_scaler.min", min.len(), columns.len())?;
                    check_len("min_max_scaler.scale", scale.len(), columns.len())?;
                    let columns = positions(columns)?;
                    mark(&columns, ColumnKind::Numeric)?;
                    Step::MinMax { columns, factor: scale.clone(), shift: min.clone() }
                }
                TransformerSpec::OneHot { columns, categories, handle_unknown } => {
                    check_len("one_hot.categories", categories.len(), columns.len())?;
                    let columns = positions(columns)?;
                    mark(&columns, ColumnKind::Categorical)?;
                    let categories = categories
                        .iter()
                        .map(|cats| cats.iter().map(FeatureValue::to_category).collect())
                        .collect();
                    Step::OneHot { columns, categories, handle_unknown: *handle_unknown }
                }
                TransformerSpec::Passthrough { columns } => {
                    let columns = positions(columns)?;
                    mark(&columns, ColumnKind::Numeric)?;
                    Step::Passthrough { columns }
                }
            };
            steps.push(step);
        }

        let output_width = steps.iter().map(Step::width).sum();
        if output_width == 0 {
            return Err("preprocessor produces no output columns".to_string());
        }

        // Remainder columns are dropped; assemble them as numeric
        let schema = FeatureSchema::new(
            spec.feature_names_in
                .iter()
                .zip(kinds)
                .map(|(name, kind)| ColumnSpec {
                    name: name.clone(),
                    kind: kind.unwrap_or(ColumnKind::Numeric),
                })
                .collect(),
        );

        Ok(Self { schema, steps, output_width })
    }

    /// Declared input schema
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    pub fn transform(&self, row: &FeatureRow) -> Result<Array1<f64>, InferenceError> {
        let expected: Vec<&str> = self.schema.columns().iter().map(|c| c.name.as_str()).collect();
        let got: Vec<&str> = row.columns().collect();
        if expected != got {
            return Err(InferenceError::ColumnMismatch {
                expected: expected.join(","),
                got: got.join(","),
            });
        }

        let cells: Vec<&FeatureValue> = row.iter().map(|(_, v)| v).collect();
        let column_name = |c: usize| self.schema.columns()[c].name.clone();
        let number = |c: usize| -> Result<f64, InferenceError> {
            cells[c].as_number().ok_or_else(|| InferenceError::TypeMismatch {
                column: column_name(c),
                expected: "number",
            })
        };

        let mut out = Vec::with_capacity(self.output_width);
        for step in &self.steps {
            match step {
                Step::Affine { columns, offset, divisor } => {
                    for (i, &c) in columns.iter().enumerate() {
                        out.push((number(c)? - offset[i]) / divisor[i]);
                    }
                }
                Step::MinMax { columns, factor, shift } => {
                    for (i, &c) in columns.iter().enumerate() {
                        out.push(number(c)? * factor[i] + shift[i]);
                    }
                }
                Step::OneHot { columns, categories, handle_unknown } => {
                    for (i, &c) in columns.iter().enumerate() {
                        let value = cells[c].as_text().ok_or_else(|| InferenceError::TypeMismatch {
                            column: column_name(c),
                            expected: "text",
                        })?;
                        let hit = categories[i].iter().position(|cat| cat == value);
                        if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                            return Err(InferenceError::UnknownCategory {
                                column: column_name(c),
                                value: value.to_string(),
                            });
                        }
                        out.extend((0..categories[i].len()).map(|k| if Some(k) == hit { 1.0 } else { 0.0 }));
                    }
                }
                Step::Passthrough { columns } => {
                    for &c in columns {
                        out.push(number(c)?);
                    }
                }
            }
        }

        Ok(Array1::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureAssembler;
    use std::collections::BTreeMap;

    fn spec(json: &str) -> PreprocessorSpec {
        serde_json::from_str(json).unwrap()
    }

    fn preprocessor() -> Preprocessor {
        Preprocessor::from_spec(spec(
            r#"{
                "feature_names_in": ["depth", "city", "magnitude", "agency", "weathercode"],
                "transformers": [
                    {"kind": "standard_scaler", "columns": ["depth"], "mean": [30.0], "scale": [10.0]},
                    {"kind": "one_hot", "columns": ["city"], "categories": [["Ambon", "Tual"]]},
                    {"kind": "min_max_scaler", "columns": ["magnitude"], "min": [-0.5], "scale": [0.1]},
                    {"kind": "passthrough", "columns": ["weathercode"]}
                ]
            }"#,
        ))
        .unwrap()
    }

    fn row(pre: &Preprocessor, city: &str) -> FeatureRow {
        let mut fields = BTreeMap::new();
        fields.insert("depth".to_string(), FeatureValue::from(50.0));
        fields.insert("city".to_string(), FeatureValue::from(city));
        fields.insert("magnitude".to_string(), FeatureValue::from(7.0));
        fields.insert("weathercode".to_string(), FeatureValue::from(800));
        FeatureAssembler::new(pre.schema().clone()).assemble(&fields)
    }

    #[test]
    fn test_schema_discovery() {
        let pre = preprocessor();
        assert_eq!(pre.output_width(), 5);
        assert_eq!(pre.schema().kind_of("city"), Some(ColumnKind::Categorical));
        assert_eq!(pre.schema().kind_of("depth"), Some(ColumnKind::Numeric));
        // Remainder column still part of the input schema
        assert_eq!(pre.schema().kind_of("agency"), Some(ColumnKind::Numeric));
    }

    #[test]
    fn test_transform() {
        let pre = preprocessor();
        let x = pre.transform(&row(&pre, "Tual")).unwrap();
        let expected = [2.0, 0.0, 1.0, 0.2, 800.0];
        assert_eq!(x.len(), expected.len());
        for (got, want) in x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_unknown_category_ignored_by_default() {
        let pre = preprocessor();
        let x = pre.transform(&row(&pre, "Jakarta")).unwrap();
        assert_eq!(x[1], 0.0);
        assert_eq!(x[2], 0.0);
    }

    #[test]
    fn test_unknown_category_error() {
        let pre = Preprocessor::from_spec(spec(
            r#"{"feature_names_in": ["city"], "transformers": [
                {"kind": "one_hot", "columns": ["city"], "categories": [["Ambon"]], "handle_unknown": "error"}
            ]}"#,
        ))
        .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("city".to_string(), FeatureValue::from("Tual"));
        let row = FeatureAssembler::new(pre.schema().clone()).assemble(&fields);
        assert!(matches!(pre.transform(&row), Err(InferenceError::UnknownCategory { .. })));
    }

    #[test]
    fn test_column_mismatch() {
        let pre = preprocessor();
        let other = FeatureRow::from_cells(vec![("depth".to_string(), FeatureValue::from(1.0))]);
        assert!(matches!(pre.transform(&other), Err(InferenceError::ColumnMismatch { .. })));
    }

    #[test]
    fn test_invalid_specs() {
        let unknown_column = spec(
            r#"{"feature_names_in": ["a"], "transformers": [{"kind": "passthrough", "columns": ["b"]}]}"#,
        );
        assert!(Preprocessor::from_spec(unknown_column).is_err());

        let zero_scale = spec(
            r#"{"feature_names_in": ["a"], "transformers": [
                {"kind": "standard_scaler", "columns": ["a"], "mean": [0.0], "scale": [0.0]}
            ]}"#,
        );
        assert!(Preprocessor::from_spec(zero_scale).is_err());

        let conflicting = spec(
            r#"{"feature_names_in": ["a"], "transformers": [
                {"kind": "passthrough", "columns": ["a"]},
                {"kind": "one_hot", "columns": ["a"], "categories": [["x"]]}
            ]}"#,
        );
        assert!(Preprocessor::from_spec(conflicting).is_err());

        let short_mean = spec(
            r#"{"feature_names_in": ["a", "b"], "transformers": [
                {"kind": "standard_scaler", "columns": ["a", "b"], "mean": [0.0], "scale": [1.0, 1.0]}
            ]}"#,
        );
        assert!(Preprocessor::from_spec(short_mean).is_err());
    }

    #[test]
    fn test_numeric_categories() {
        let pre = Preprocessor::from_spec(spec(
            r#"{"feature_names_in": ["weathercode"], "transformers": [
                {"kind": "one_hot", "columns": ["weathercode"], "categories": [[500, 800]]}
            ]}"#,
        ))
        .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("weathercode".to_string(), FeatureValue::from(800));
        let row = FeatureAssembler::new(pre.schema().clone()).assemble(&fields);
        assert_eq!(pre.transform(&row).unwrap().to_vec(), vec![0.0, 1.0]);
    }
}
