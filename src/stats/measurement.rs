use crate::models::{BodyPart, BodySeries, Measurement, MeasurementStats};

/// Reduces measurements sorted oldest first.
pub fn summarize(measurements: &[Measurement]) -> MeasurementStats {
    let (Some(initial), Some(current)) = (measurements.first(), measurements.last()) else {
        return MeasurementStats::default();
    };

    let weight_change = match (initial.weight, current.weight) {
        (Some(initial), Some(current)) => Some(current - initial),
        _ => None,
    };

    let mut body_measurements = BodySeries::default();
    for body in measurements.iter().filter_map(Measurement::latest_body) {
        for part in BodyPart::ALL {
            if let Some(value) = body.value(part) {
                body_measurements.push(part, value);
            }
        }
    }

    MeasurementStats {
        current_weight: current.weight,
        initial_weight: initial.weight,
        weight_change,
        body_fat_percentage: current.body_fat_percentage,
        body_measurements,
        dates: measurements.iter().map(|m| m.date.clone()).collect(),
    }
}
