mod activity;
mod auth;
mod client;
mod measurement;
mod nutrition;
mod workout;

use serde::{Deserialize, Deserializer};

pub use activity::{
    ActivityEntry, ActivityPatch, ActivityStats, ActivityTypeTotal, DailyActivityBreakdown,
    DailyStats, NewActivity,
};
pub use auth::{AuthUser, Role, SignUpData, UserMetadata};
pub use client::{Client, ClientPatch, ClientProfile, NewClient};
pub use measurement::{
    BodyMeasurement, BodyMeasurementValues, BodyPart, BodySeries, Measurement, MeasurementPatch,
    MeasurementPhoto, MeasurementStats, NewMeasurement, PhotoType, PhotoUpload,
};
pub use nutrition::{MealType, NewNutritionEntry, NutritionEntry, NutritionPatch, NutritionStats};
pub use workout::{
    Difficulty, Exercise, ExerciseSet, NewExercise, NewProgram, NewWorkout, NumericText, Program,
    Workout, WorkoutPatch, WorkoutStats,
};

/// Reads an explicit JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
