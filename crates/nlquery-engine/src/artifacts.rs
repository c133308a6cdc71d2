//! Optional response artifacts: chart configurations and map overlays.
//!
//! Both come back from the model as JSON text. Parsing is strict enough to
//! keep a subscriber from receiving something it cannot render; any failure
//! is an [`ArtifactError`] and the engine drops the artifact.

use nlquery_llm::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// First fenced block with any language tag.
static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").unwrap());

/// JSON body of model output, with a surrounding code fence removed.
fn json_body(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Why an artifact was not produced.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid chart: {0}")]
    InvalidChart(String),

    #[error("invalid map overlay: {0}")]
    InvalidMap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
}

/// Chart configuration streamed in a `chart` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    #[serde(default)]
    pub title: String,
    pub x_key: String,
    pub y_key: String,
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
}

impl ChartSpec {
    /// Parse model output into a chart.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, an unknown chart type, empty axis keys or
    /// empty data.
    pub fn parse(text: &str) -> Result<Self, ArtifactError> {
        let spec: ChartSpec = serde_json::from_str(json_body(text))?;
        if spec.x_key.trim().is_empty() || spec.y_key.trim().is_empty() {
            return Err(ArtifactError::InvalidChart("axis keys must not be empty".to_string()));
        }
        if spec.data.is_empty() {
            return Err(ArtifactError::InvalidChart("no data points".to_string()));
        }
        Ok(spec)
    }
}

/// GeoJSON feature collection streamed in a `map` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn feature_kind() -> String {
    "Feature".to_string()
}

impl FeatureCollection {
    /// Parse model output into a feature collection.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, a `type` other than `FeatureCollection`, or a
    /// feature whose geometry is not an object with a `type`.
    pub fn parse(text: &str) -> Result<Self, ArtifactError> {
        let collection: FeatureCollection = serde_json::from_str(json_body(text))?;
        if collection.kind != "FeatureCollection" {
            return Err(ArtifactError::InvalidMap(format!(
                "expected type FeatureCollection, got {}",
                collection.kind
            )));
        }
        for (index, feature) in collection.features.iter().enumerate() {
            let has_type = feature
                .geometry
                .get("type")
                .and_then(Value::as_str)
                .is_some();
            if !has_type {
                return Err(ArtifactError::InvalidMap(format!(
                    "feature {index} has no geometry type"
                )));
            }
        }
        Ok(collection)
    }
}
