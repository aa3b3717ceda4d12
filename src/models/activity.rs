use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Date or timestamp, as stored.
    pub date: String,
    pub activity_type: String,
    /// Minutes.
    pub duration: i64,
    #[serde(default)]
    pub calories_burned: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ActivityEntry {
    /// Date-only portion of `date`.
    pub fn day(&self) -> &str {
        self.date.split('T').next().unwrap_or(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub client_id: Uuid,
    pub date: String,
    pub activity_type: String,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories_burned: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories_burned: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityTypeTotal {
    pub activity_type: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total_minutes: i64,
    /// Cumulative minutes per type, in order of first occurrence.
    pub types: Vec<ActivityTypeTotal>,
    pub calories_burned: f64,
    pub activity_by_date: BTreeMap<String, i64>,
    pub most_frequent_activity: Option<String>,
}

impl ActivityStats {
    pub fn minutes_for(&self, activity_type: &str) -> Option<i64> {
        self.types
            .iter()
            .find(|total| total.activity_type == activity_type)
            .map(|total| total.minutes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyActivityBreakdown {
    pub activity_type: String,
    pub duration: i64,
    pub calories: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub total_duration: i64,
    pub total_calories: f64,
    pub activities: Vec<DailyActivityBreakdown>,
}

impl DailyStats {
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            ..Self::default()
        }
    }
}
