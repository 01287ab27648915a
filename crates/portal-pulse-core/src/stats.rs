// Dashboard dataset types
//
// Wire shape consumed by the dashboard frontend:
//   {"data": [{"type": "pie", "title": "...", "data": [{"key", "label", "count"}]}]}

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Chart type of a dataset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum DatasetKind {
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "bar-single")]
    BarSingle,
    #[serde(rename = "bar-multiple")]
    BarMulti,
}

/// One bar, slice or line point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DataPoint {
    /// Stable identifier (e.g., "direct-signup").
    pub key: String,
    /// Display text.
    pub label: String,
    pub count: u64,
}

impl DataPoint {
    pub fn new(key: impl Into<String>, label: impl Into<String>, count: i64) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            count: count.max(0) as u64,
        }
    }
}

/// A named chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DashboardDataset {
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    pub title: String,
    #[serde(rename = "data")]
    pub points: Vec<DataPoint>,
}

impl DashboardDataset {
    pub fn new(kind: DatasetKind, title: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            kind,
            title: title.into(),
            points,
        }
    }

    pub fn point(&self, key: &str) -> Option<&DataPoint> {
        self.points.iter().find(|p| p.key == key)
    }
}

/// Response body of the dashboard endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StatsResponse {
    pub data: Vec<DashboardDataset>,
}
