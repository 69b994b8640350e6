use std::fmt;

use serde::{Deserialize, Serialize};

/// Percentage cutoffs for the status bands. Only `excellent`, `good` and
/// `moderate` are band edges; `at_risk` is carried for stored classes that set it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
    pub at_risk: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            excellent: 95.0,
            good: 90.0,
            moderate: 85.0,
            at_risk: 85.0,
        }
    }
}

impl Thresholds {
    /// Class-specific thresholds layered over the caller's default.
    pub fn resolve(class: Option<&ThresholdOverrides>, default: &Thresholds) -> Thresholds {
        match class {
            Some(overrides) => overrides.apply(default),
            None => *default,
        }
    }
}

/// Thresholds as stored on a class or given in configuration; any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excellent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderate: Option<f64>,
    #[serde(default, alias = "at_risk", skip_serializing_if = "Option::is_none")]
    pub at_risk: Option<f64>,
}

impl ThresholdOverrides {
    /// Reads a stored thresholds value. Empty objects, arrays and nulls mean "not set".
    pub fn from_stored(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let overrides: ThresholdOverrides = serde_json::from_value(value.clone()).ok()?;
        if overrides.is_empty() {
            None
        } else {
            Some(overrides)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.excellent.is_none()
            && self.good.is_none()
            && self.moderate.is_none()
            && self.at_risk.is_none()
    }

    pub fn apply(&self, base: &Thresholds) -> Thresholds {
        Thresholds {
            excellent: self.excellent.unwrap_or(base.excellent),
            good: self.good.unwrap_or(base.good),
            moderate: self.moderate.unwrap_or(base.moderate),
            at_risk: self.at_risk.unwrap_or(base.at_risk),
        }
    }
}

/// Qualitative attendance band, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Excellent,
    Good,
    Moderate,
    Risk,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Excellent => "excellent",
            Status::Good => "good",
            Status::Moderate => "moderate",
            Status::Risk => "risk",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First band whose lower edge the percentage reaches. Out-of-range
/// percentages are not clamped.
pub fn classify(percentage: f64, thresholds: &Thresholds) -> Status {
    if percentage >= thresholds.excellent {
        Status::Excellent
    } else if percentage >= thresholds.good {
        Status::Good
    } else if percentage >= thresholds.moderate {
        Status::Moderate
    } else {
        Status::Risk
    }
}
