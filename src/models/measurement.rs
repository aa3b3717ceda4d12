use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub client_id: Uuid,
    pub date: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body_measurements: Vec<BodyMeasurement>,
}

impl Measurement {
    /// Most recently created body row; later rows win ties.
    pub fn latest_body(&self) -> Option<&BodyMeasurement> {
        self.body_measurements
            .iter()
            .enumerate()
            .max_by(|(i, a), (j, b)| a.created_at.cmp(&b.created_at).then(i.cmp(j)))
            .map(|(_, body)| body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub id: Uuid,
    pub measurement_id: Uuid,
    #[serde(default)]
    pub chest: Option<f64>,
    #[serde(default)]
    pub waist: Option<f64>,
    #[serde(default)]
    pub hips: Option<f64>,
    #[serde(default)]
    pub arms: Option<f64>,
    #[serde(default)]
    pub thighs: Option<f64>,
    #[serde(default)]
    pub calves: Option<f64>,
    #[serde(default)]
    pub shoulders: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BodyMeasurement {
    pub fn value(&self, part: BodyPart) -> Option<f64> {
        match part {
            BodyPart::Chest => self.chest,
            BodyPart::Waist => self.waist,
            BodyPart::Hips => self.hips,
            BodyPart::Arms => self.arms,
            BodyPart::Thighs => self.thighs,
            BodyPart::Calves => self.calves,
            BodyPart::Shoulders => self.shoulders,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPart {
    Chest,
    Waist,
    Hips,
    Arms,
    Thighs,
    Calves,
    Shoulders,
}

impl BodyPart {
    pub const ALL: [BodyPart; 7] = [
        Self::Chest,
        Self::Waist,
        Self::Hips,
        Self::Arms,
        Self::Thighs,
        Self::Calves,
        Self::Shoulders,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Waist => "waist",
            Self::Hips => "hips",
            Self::Arms => "arms",
            Self::Thighs => "thighs",
            Self::Calves => "calves",
            Self::Shoulders => "shoulders",
        }
    }
}

/// Girth values for a new or updated body row; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodyMeasurementValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chest: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hips: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thighs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calves: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoulders: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMeasurement {
    pub client_id: Uuid,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoType {
    Front,
    Side,
    Back,
    Other,
}

impl PhotoType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Side => "side",
            Self::Back => "back",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PhotoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "side" => Ok(Self::Side),
            "back" => Ok(Self::Back),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown photo type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPhoto {
    pub id: Uuid,
    pub client_id: Uuid,
    pub photo_url: String,
    pub date: String,
    #[serde(rename = "type")]
    pub photo_type: PhotoType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// File handed to the photo upload.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub client_id: Uuid,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub photo_type: PhotoType,
    pub date: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodySeries {
    pub chest: Vec<f64>,
    pub waist: Vec<f64>,
    pub hips: Vec<f64>,
    pub arms: Vec<f64>,
    pub thighs: Vec<f64>,
    pub calves: Vec<f64>,
    pub shoulders: Vec<f64>,
}

impl BodySeries {
    pub fn series(&self, part: BodyPart) -> &[f64] {
        match part {
            BodyPart::Chest => &self.chest,
            BodyPart::Waist => &self.waist,
            BodyPart::Hips => &self.hips,
            BodyPart::Arms => &self.arms,
            BodyPart::Thighs => &self.thighs,
            BodyPart::Calves => &self.calves,
            BodyPart::Shoulders => &self.shoulders,
        }
    }

    pub fn push(&mut self, part: BodyPart, value: f64) {
        match part {
            BodyPart::Chest => self.chest.push(value),
            BodyPart::Waist => self.waist.push(value),
            BodyPart::Hips => self.hips.push(value),
            BodyPart::Arms => self.arms.push(value),
            BodyPart::Thighs => self.thighs.push(value),
            BodyPart::Calves => self.calves.push(value),
            BodyPart::Shoulders => self.shoulders.push(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementStats {
    pub current_weight: Option<f64>,
    pub initial_weight: Option<f64>,
    pub weight_change: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub body_measurements: BodySeries,
    pub dates: Vec<String>,
}
