//! Blend request: the parameters of one pipeline run.
//!
//! `RequestPayload` is the JSON wire form; `BlendRequest` is the validated form
//! the pipeline consumes. Overrides are keyed by `(entity, category)` so two
//! entries can never target the same cell.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BlendError;

/// Identifies the cells an override rescales: column `entity`, rows of `category`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OverrideKey {
    pub entity: String,
    pub category: String,
}

impl OverrideKey {
    pub fn new(entity: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            category: category.into(),
        }
    }
}

impl std::fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity, self.category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlendRequest {
    pub year: i32,
    pub scenario: String,
    pub weather_year: i32,
    pub overrides: BTreeMap<OverrideKey, f64>,
    /// Category -> fallback scenario. "No fallback" entries are already removed.
    pub fallbacks: BTreeMap<String, String>,
}

impl BlendRequest {
    pub fn new(year: i32, scenario: impl Into<String>, weather_year: i32) -> Self {
        Self {
            year,
            scenario: scenario.into(),
            weather_year,
            overrides: BTreeMap::new(),
            fallbacks: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, entity: &str, category: &str, multiplier: f64) -> Self {
        self.overrides.insert(OverrideKey::new(entity, category), multiplier);
        self
    }

    pub fn with_fallback(mut self, category: &str, scenario: &str) -> Self {
        self.fallbacks.insert(category.to_string(), scenario.to_string());
        self
    }

    /// Check the invariants the transform relies on.
    pub fn validate(&self) -> Result<(), BlendError> {
        validate_scenario(&self.scenario)?;
        for scenario in self.fallbacks.values() {
            validate_scenario(scenario)?;
        }
        for (key, multiplier) in &self.overrides {
            if !(multiplier.is_finite() && *multiplier >= 0.0) {
                return Err(BlendError::InvalidRequest(format!(
                    "multiplier for {key} must be finite and >= 0, got {multiplier}"
                )));
            }
        }
        Ok(())
    }
}

fn validate_scenario(scenario: &str) -> Result<(), BlendError> {
    if scenario.trim().is_empty() {
        return Err(BlendError::InvalidRequest("scenario must not be empty".to_string()));
    }
    if scenario.contains(['/', '\\']) {
        return Err(BlendError::InvalidRequest(format!(
            "scenario '{scenario}' must not contain a path separator"
        )));
    }
    Ok(())
}

/// JSON body accepted by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestPayload {
    pub year: IntOrString,
    pub scenario: String,
    pub weather_year: IntOrString,
    #[serde(default)]
    pub custom_values: CustomValues,
    #[serde(default)]
    pub fallback_scenarios: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    Str(String),
}

impl IntOrString {
    fn to_i32(&self, field: &str) -> Result<i32, BlendError> {
        let value = match self {
            IntOrString::Int(v) => *v,
            IntOrString::Str(s) => s.trim().parse::<i64>().map_err(|_| {
                BlendError::InvalidRequest(format!("`{field}` must be an integer, got '{s}'"))
            })?,
        };
        i32::try_from(value)
            .map_err(|_| BlendError::InvalidRequest(format!("`{field}` out of range: {value}")))
    }
}

/// `custom_values` in either list form or nested `{entity: {category: multiplier}}` form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CustomValues {
    Entries(Vec<OverrideEntry>),
    Nested(BTreeMap<String, BTreeMap<String, f64>>),
}

impl Default for CustomValues {
    fn default() -> Self {
        CustomValues::Entries(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    pub entity: String,
    pub category: String,
    pub multiplier: f64,
}

impl RequestPayload {
    pub fn into_request(self) -> Result<BlendRequest, BlendError> {
        let mut request = BlendRequest::new(
            self.year.to_i32("year")?,
            self.scenario,
            self.weather_year.to_i32("weather_year")?,
        );

        match self.custom_values {
            CustomValues::Entries(entries) => {
                for entry in entries {
                    let key = OverrideKey::new(entry.entity, entry.category);
                    if request.overrides.contains_key(&key) {
                        return Err(BlendError::InvalidRequest(format!(
                            "duplicate override for {key}"
                        )));
                    }
                    request.overrides.insert(key, entry.multiplier);
                }
            }
            CustomValues::Nested(by_entity) => {
                for (entity, by_category) in by_entity {
                    for (category, multiplier) in by_category {
                        request
                            .overrides
                            .insert(OverrideKey::new(entity.clone(), category), multiplier);
                    }
                }
            }
        }

        request.fallbacks = self
            .fallback_scenarios
            .into_iter()
            .filter_map(|(category, scenario)| match scenario {
                Some(s) if !s.trim().is_empty() => Some((category, s)),
                _ => None,
            })
            .collect();

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<BlendRequest, BlendError> {
        serde_json::from_str::<RequestPayload>(json).unwrap().into_request()
    }

    #[test]
    fn list_form_and_string_years() {
        let req = parse(
            r#"{
                "year": "2030",
                "scenario": "high",
                "weather_year": 2012,
                "custom_values": [{"entity": "TX", "category": "residential", "multiplier": 1.5}],
                "fallback_scenarios": {"industrial": "baseline", "commercial": null, "transport": ""}
            }"#,
        )
        .unwrap();

        assert_eq!(req.year, 2030);
        assert_eq!(req.weather_year, 2012);
        assert_eq!(req.overrides.get(&OverrideKey::new("TX", "residential")), Some(&1.5));
        assert_eq!(req.fallbacks.len(), 1);
        assert_eq!(req.fallbacks.get("industrial").map(String::as_str), Some("baseline"));
    }

    #[test]
    fn nested_form_is_accepted() {
        let req = parse(
            r#"{"year": 2030, "scenario": "high", "weather_year": 2012,
                "custom_values": {"TX": {"residential": 1.1, "commercial": 0.9}}}"#,
        )
        .unwrap();
        assert_eq!(req.overrides.len(), 2);
        assert_eq!(req.overrides.get(&OverrideKey::new("TX", "commercial")), Some(&0.9));
    }

    #[test]
    fn duplicate_override_is_rejected() {
        let err = parse(
            r#"{"year": 2030, "scenario": "high", "weather_year": 2012,
                "custom_values": [
                    {"entity": "TX", "category": "residential", "multiplier": 1.5},
                    {"entity": "TX", "category": "residential", "multiplier": 2.0}
                ]}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid-request");
    }

    #[test]
    fn negative_multiplier_and_bad_scenario_are_rejected() {
        let req = BlendRequest::new(2030, "high", 2012).with_override("TX", "res", -1.0);
        assert!(req.validate().is_err());

        let req = BlendRequest::new(2030, "../etc", 2012);
        assert!(req.validate().is_err());

        let req = BlendRequest::new(2030, "high", 2012).with_fallback("res", " ");
        assert!(req.validate().is_err());
    }

    #[test]
    fn non_integer_year_is_rejected() {
        let err = parse(r#"{"year": "soon", "scenario": "high", "weather_year": 2012}"#).unwrap_err();
        assert!(err.to_string().contains("`year`"));
    }
}
