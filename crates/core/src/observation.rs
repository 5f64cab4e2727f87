//! Sensor observation domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single measured result, typed per the observation value hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum ObservationValue {
    /// Numeric measurement (requires a unit of measure for most encodings).
    Quantity(f64),
    /// Integer count.
    Count(i64),
    /// Free-text result.
    Text(String),
    /// Truth value.
    Boolean(bool),
    /// Controlled-vocabulary term.
    Category(String),
}

/// Timestamp/value pair, the lightweight projection of one stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeValuePair {
    pub time: DateTime<Utc>,
    pub value: ObservationValue,
}

/// A fully assembled sensor observation.
///
/// Identity fields (procedure, observable property, feature of interest,
/// offering) describe the time series; record-scoped fields (times, value,
/// unit) come from one stored record. A value-less instance acts as the
/// template other observations are cloned from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub procedure: String,
    pub observable_property: String,
    pub feature_of_interest: String,
    pub offering: Option<String>,
    pub unit: Option<String>,
    pub phenomenon_time: Option<DateTime<Utc>>,
    pub result_time: Option<DateTime<Utc>>,
    pub value: Option<ObservationValue>,
}

impl Observation {
    /// New template observation carrying only time-series identity.
    pub fn template(
        procedure: impl Into<String>,
        observable_property: impl Into<String>,
        feature_of_interest: impl Into<String>,
    ) -> Self {
        Self {
            procedure: procedure.into(),
            observable_property: observable_property.into(),
            feature_of_interest: feature_of_interest.into(),
            offering: None,
            unit: None,
            phenomenon_time: None,
            result_time: None,
            value: None,
        }
    }

    /// Set the offering on a template (builder-style).
    #[must_use]
    pub fn with_offering(mut self, offering: impl Into<String>) -> Self {
        self.offering = Some(offering.into());
        self
    }

    /// Set the unit of measure on a template (builder-style).
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Clone this observation for use as a per-record result.
    ///
    /// Identity fields are kept; record-scoped fields (times, value) are
    /// cleared so a previously assembled observation can also serve as a
    /// template. The original is never mutated.
    #[must_use]
    pub fn clone_template(&self) -> Self {
        Self {
            phenomenon_time: None,
            result_time: None,
            value: None,
            ..self.clone()
        }
    }
}
