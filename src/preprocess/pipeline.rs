use serde::{Deserialize, Serialize};

use super::impute::MissingPolicy;
use super::scale::Scaler;
use crate::Error;

/// Fitted feature transformation replayed at prediction time.
///
/// Raw values go through imputation (when the policy allows it) and then the
/// scaler fitted on the training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub feature_names: Vec<String>,
    pub missing: MissingPolicy,
    /// Per-feature fill values; absent under [`MissingPolicy::DropRows`].
    pub fill_values: Option<Vec<f64>>,
    pub scaler: Scaler,
}

impl FeaturePipeline {
    pub fn feature_len(&self) -> usize {
        self.feature_names.len()
    }

    /// Impute and scale one raw feature vector.
    pub fn transform(&self, raw: &[Option<f64>]) -> Result<Vec<f64>, Error> {
        if raw.len() != self.feature_len() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} feature values, got {}",
                self.feature_len(),
                raw.len()
            )));
        }
        let mut row = Vec::with_capacity(raw.len());
        for (idx, value) in raw.iter().enumerate() {
            let value = match (value, &self.fill_values) {
                (Some(value), _) if value.is_finite() => *value,
                (Some(_), _) => {
                    return Err(Error::SchemaMismatch(format!(
                        "value for '{}' is not a finite number",
                        self.feature_names[idx]
                    )));
                }
                (None, Some(fills)) => fills[idx],
                (None, None) => {
                    return Err(Error::SchemaMismatch(format!(
                        "value for '{}' is required",
                        self.feature_names[idx]
                    )));
                }
            };
            row.push(value);
        }
        self.scaler.transform_in_place(&mut row);
        Ok(row)
    }

    /// Internal consistency check used when loading persisted artifacts.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let width = self.feature_len();
        if width == 0 {
            return Err("pipeline has no features".to_string());
        }
        if self.missing.imputes() != self.fill_values.is_some() {
            return Err("fill values do not match the missing-value policy".to_string());
        }
        if let Some(fills) = &self.fill_values
            && fills.len() != width
        {
            return Err(format!("{} fill values for {width} features", fills.len()));
        }
        if let Some(scaled) = self.scaler.width()
            && scaled != width
        {
            return Err(format!("scaler fitted on {scaled} features, expected {width}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(missing: MissingPolicy) -> FeaturePipeline {
        FeaturePipeline {
            feature_names: vec!["a".into(), "b".into()],
            missing,
            fill_values: missing.imputes().then(|| vec![2.0, 4.0]),
            scaler: Scaler::Standard {
                means: vec![2.0, 4.0],
                stds: vec![1.0, 2.0],
            },
        }
    }

    #[test]
    fn imputes_then_scales() {
        let out = pipeline(MissingPolicy::ImputeMean)
            .transform(&[Some(3.0), None])
            .unwrap();
        assert_eq!(out, vec![1.0, 0.0]);
    }

    #[test]
    fn drop_policy_requires_every_value() {
        let err = pipeline(MissingPolicy::DropRows)
            .transform(&[Some(3.0), None])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(msg) if msg.contains("'b'")));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = pipeline(MissingPolicy::ImputeMean)
            .transform(&[Some(1.0)])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn validate_catches_inconsistent_fills() {
        let mut broken = pipeline(MissingPolicy::ImputeMean);
        broken.fill_values = Some(vec![1.0]);
        assert!(broken.validate().is_err());
        assert!(pipeline(MissingPolicy::DropRows).validate().is_ok());
    }
}
