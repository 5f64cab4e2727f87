//! Query descriptors for streaming value retrieval.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{SERVICE_SOS, SERVICE_VERSION};

/// Datasource key of a procedure (sensor system).
///
/// Semantically distinct from the other dimension keys; wrapping in a
/// newtype prevents accidental swaps at construction sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcedureId(pub i64);

/// Datasource key of an observable property (phenomenon).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservablePropertyId(pub i64);

/// Datasource key of a feature of interest (sampling location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub i64);

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ObservablePropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Optional temporal restriction on retrieved values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalFilter {
    /// Closed phenomenon-time interval.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Only the most recent value of the series.
    Latest,
    /// Only the earliest value of the series.
    First,
}

/// Requested response encoding; drives how record fields merge into an
/// assembled observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// O&M 2.0 observation encoding.
    Om2,
    /// WaterML 2.0 time-series encoding. Quantity results must carry a
    /// unit of measure.
    Waterml2,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        Self::Om2
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Om2 => f.write_str("om-2"),
            Self::Waterml2 => f.write_str("waterml-2"),
        }
    }
}

/// Immutable descriptor of one streaming value request.
///
/// Created once per caller request and never mutated afterwards; the
/// service name and version ride along so response-modifier lookups need
/// no ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueQuery {
    pub service: String,
    pub version: String,
    pub procedure: ProcedureId,
    pub observable_property: ObservablePropertyId,
    pub feature_of_interest: FeatureId,
    pub temporal_filter: Option<TemporalFilter>,
    pub response_format: ResponseFormat,
}

impl ValueQuery {
    /// Descriptor for the full series, default service identity and format.
    pub fn new(
        procedure: ProcedureId,
        observable_property: ObservablePropertyId,
        feature_of_interest: FeatureId,
    ) -> Self {
        Self {
            service: SERVICE_SOS.to_owned(),
            version: SERVICE_VERSION.to_owned(),
            procedure,
            observable_property,
            feature_of_interest,
            temporal_filter: None,
            response_format: ResponseFormat::default(),
        }
    }

    /// Restrict the descriptor to a temporal filter (builder-style).
    #[must_use]
    pub fn with_temporal_filter(mut self, filter: TemporalFilter) -> Self {
        self.temporal_filter = Some(filter);
        self
    }

    /// Request a specific response format (builder-style).
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}
