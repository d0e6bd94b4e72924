//! Roast-analysis result returned by the analysis endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Charts with this many base64 characters or fewer are treated as missing data.
pub const MIN_CHART_LEN: usize = 100;

/// Structured result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Predicted roast level ("Light", "Medium", "Dark", ...).
    pub roast_level: String,
    /// Model confidence, clamped into `[0, 1]`.
    #[serde(deserialize_with = "unit_interval")]
    pub confidence: f64,
    /// Whether the server produced a simulated answer.
    #[serde(default)]
    pub is_simulated: bool,
    /// Legacy location of the brewing recommendation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_brewing: Option<String>,
    /// Optional detail block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDetails>,
}

/// Optional details attached to a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_brewing: Option<String>,
    /// Base64-encoded PNG chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<String>,
    /// Probability per roast class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_probabilities: Option<BTreeMap<String, f64>>,
}

/// Availability of the analysis chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart<'a> {
    /// No chart in the response.
    Missing,
    /// A chart field too short to hold an image.
    Insufficient,
    /// Base64 PNG data worth showing.
    Available(&'a str),
}

impl AnalysisResult {
    /// Brewing recommendation, preferring the detail block.
    pub fn brewing_recommendation(&self) -> Option<&str> {
        self.analysis
            .as_ref()
            .and_then(|a| a.recommended_brewing.as_deref())
            .or(self.recommended_brewing.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Chart availability.
    pub fn chart(&self) -> Chart<'_> {
        match self.analysis.as_ref().and_then(|a| a.chart_image.as_deref()) {
            None => Chart::Missing,
            Some(data) if data.len() <= MIN_CHART_LEN => Chart::Insufficient,
            Some(data) => Chart::Available(data),
        }
    }

    /// Class probabilities, ordered by label.
    pub fn class_probabilities(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.analysis
            .iter()
            .filter_map(|a| a.class_probabilities.as_ref())
            .flatten()
            .map(|(label, &p)| (label.as_str(), p.clamp(0.0, 1.0)))
    }

    /// Confidence as a percentage with one decimal.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

fn unit_interval<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() {
        return Ok(0.0);
    }
    Ok(value.clamp(0.0, 1.0))
}
