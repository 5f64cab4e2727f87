//! Raw storage records and their projections.

use chrono::{DateTime, Utc};
use observatory_core::{Observation, ObservationValue, ResponseFormat, TimeValuePair};

use crate::error::ProjectionError;

/// One row materialized from a value cursor: the stored value plus the
/// joined dimension keys.
///
/// Transient by contract: the reader detaches it from any session-level
/// cache before handing it out, and projections must not retain it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawValueRecord {
    pub observation_id: i64,
    pub procedure_id: i64,
    pub observable_property_id: i64,
    pub feature_of_interest_id: i64,
    pub phenomenon_time: DateTime<Utc>,
    pub result_time: Option<DateTime<Utc>>,
    pub value: Option<ObservationValue>,
    pub unit: Option<String>,
}

impl RawValueRecord {
    /// Project to the lightweight timestamp/value pair.
    ///
    /// Pure: applying it twice to an unmodified record yields identical
    /// pairs. A record without a result value is reported, not defaulted.
    pub fn to_time_value(&self) -> Result<TimeValuePair, ProjectionError> {
        let value = self
            .value
            .clone()
            .ok_or(ProjectionError::MissingValue { record_id: self.observation_id })?;
        Ok(TimeValuePair { time: self.phenomenon_time, value })
    }

    /// Merge this record's measured value into `observation` according to
    /// the requested response format.
    ///
    /// Copies the phenomenon/result times and the typed value; a unit on
    /// the record overrides the template's. WaterML requires a unit of
    /// measure on quantity results.
    pub fn merge_into(
        &self,
        observation: &mut Observation,
        format: ResponseFormat,
    ) -> Result<(), ProjectionError> {
        let value = self
            .value
            .clone()
            .ok_or(ProjectionError::MissingValue { record_id: self.observation_id })?;

        if format == ResponseFormat::Waterml2
            && matches!(value, ObservationValue::Quantity(_))
            && self.unit.is_none()
            && observation.unit.is_none()
        {
            return Err(ProjectionError::MissingUnit { record_id: self.observation_id, format });
        }

        observation.phenomenon_time = Some(self.phenomenon_time);
        observation.result_time = Some(self.result_time.unwrap_or(self.phenomenon_time));
        if let Some(unit) = &self.unit {
            observation.unit = Some(unit.clone());
        }
        observation.value = Some(value);
        Ok(())
    }
}
