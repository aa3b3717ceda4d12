use std::collections::BTreeMap;

use crate::models::{
    ActivityEntry, ActivityStats, ActivityTypeTotal, DailyActivityBreakdown, DailyStats,
};

pub fn summarize(activities: &[ActivityEntry]) -> ActivityStats {
    let mut total_minutes = 0;
    let mut types: Vec<ActivityTypeTotal> = Vec::new();
    let mut calories_burned = 0.0;
    let mut activity_by_date: BTreeMap<String, i64> = BTreeMap::new();

    for activity in activities {
        total_minutes += activity.duration;
        calories_burned += activity.calories_burned.unwrap_or(0.0);
        *activity_by_date.entry(activity.day().to_string()).or_insert(0) += activity.duration;

        match types
            .iter_mut()
            .find(|total| total.activity_type == activity.activity_type)
        {
            Some(total) => total.minutes += activity.duration,
            None => types.push(ActivityTypeTotal {
                activity_type: activity.activity_type.clone(),
                minutes: activity.duration,
            }),
        }
    }

    ActivityStats {
        total_minutes,
        most_frequent_activity: most_frequent(&types),
        types,
        calories_burned,
        activity_by_date,
    }
}

/// Type with the most cumulative minutes; ties go to the first one seen.
fn most_frequent(types: &[ActivityTypeTotal]) -> Option<String> {
    let mut best: Option<&ActivityTypeTotal> = None;
    for total in types {
        match best {
            Some(current) if total.minutes <= current.minutes => {}
            _ => best = Some(total),
        }
    }
    best.filter(|total| total.minutes > 0)
        .map(|total| total.activity_type.clone())
}

/// Totals for the activities logged on `date` (`YYYY-MM-DD`).
pub fn daily(activities: &[ActivityEntry], date: &str) -> DailyStats {
    let mut stats = DailyStats::empty(date);

    for activity in activities.iter().filter(|activity| activity.day() == date) {
        let calories = activity.calories_burned.unwrap_or(0.0);
        stats.total_duration += activity.duration;
        stats.total_calories += calories;

        let position = stats
            .activities
            .iter()
            .position(|breakdown| breakdown.activity_type == activity.activity_type);
        let breakdown = match position {
            Some(index) => &mut stats.activities[index],
            None => {
                stats.activities.push(DailyActivityBreakdown {
                    activity_type: activity.activity_type.clone(),
                    ..DailyActivityBreakdown::default()
                });
                let last = stats.activities.len() - 1;
                &mut stats.activities[last]
            }
        };
        breakdown.duration += activity.duration;
        breakdown.calories += calories;
        breakdown.count += 1;
    }

    stats
}
