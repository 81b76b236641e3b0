use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, trace};

use super::config::DriftPolicy;
use super::error::{Result, TrajectoryError};
use super::types::{BehaviorMetric, BehaviorSnapshot, DriftEvent, DriftType, Severity};

#[derive(Copy, Clone, Debug, PartialEq)]
enum Direction {
    Favorable,
    Unfavorable,
    Flat,
}

// Whether a rise in the metric is good news. Goal count is tracked but
// carries no direction of its own.
fn polarity(metric: BehaviorMetric) -> Option<f64> {
    match metric {
        BehaviorMetric::AverageDailyXp
        | BehaviorMetric::HabitCompletionRate
        | BehaviorMetric::StreakStabilityIndex
        | BehaviorMetric::GoalEngagementRate => Some(1.0),
        BehaviorMetric::BurnoutRiskScore => Some(-1.0),
        BehaviorMetric::ActiveGoalCount => None,
    }
}

// Puts a raw delta on a comparable, roughly unit scale: counts and XP
// relative to the earlier value, the burnout score over its 0-100 range,
// fractions as they are.
fn normalized_delta(metric: BehaviorMetric, earlier: f64, delta: f64) -> f64 {
    match metric {
        BehaviorMetric::AverageDailyXp | BehaviorMetric::ActiveGoalCount => delta / earlier.max(1.0),
        BehaviorMetric::BurnoutRiskScore => delta / 100.0,
        BehaviorMetric::HabitCompletionRate
        | BehaviorMetric::StreakStabilityIndex
        | BehaviorMetric::GoalEngagementRate => delta,
    }
}

pub fn detect_drift(
    earlier: &BehaviorSnapshot,
    later: &BehaviorSnapshot,
    detection_date: NaiveDate,
) -> Result<Option<DriftEvent>> {
    detect_drift_with(earlier, later, detection_date, &DriftPolicy::default())
}

pub fn detect_drift_with(
    earlier: &BehaviorSnapshot,
    later: &BehaviorSnapshot,
    detection_date: NaiveDate,
    policy: &DriftPolicy,
) -> Result<Option<DriftEvent>> {
    let days_between = later.date().signed_duration_since(earlier.date()).num_days();
    if days_between <= 0 {
        return Err(TrajectoryError::precondition(format!(
            "later snapshot ({}) must be dated after the earlier one ({})",
            later.date(),
            earlier.date()
        )));
    }
    if detection_date < later.date() {
        return Err(TrajectoryError::precondition(format!(
            "detection date {detection_date} precedes the later snapshot ({})",
            later.date()
        )));
    }
    if days_between < policy.min_window_days {
        trace!(days_between, min = policy.min_window_days, "window too short for drift");
        return Ok(None);
    }

    let mut affected_metrics = BTreeMap::new();
    let mut normalized = Vec::with_capacity(BehaviorMetric::ALL.len());
    for metric in BehaviorMetric::ALL {
        let before = earlier.metric(metric);
        let delta = later.metric(metric) - before;
        affected_metrics.insert(metric, delta);
        normalized.push((metric, normalized_delta(metric, before, delta)));
    }

    let aggregate =
        normalized.iter().map(|(_, d)| d.abs()).sum::<f64>() / normalized.len() as f64;
    if aggregate < policy.significance {
        debug!(days_between, aggregate, "behaviour change below significance");
        return Ok(None);
    }

    let directions: Vec<(BehaviorMetric, Direction, f64)> = normalized
        .iter()
        .filter_map(|&(metric, delta)| {
            let sign = polarity(metric)?;
            let signed = delta * sign;
            let direction = if signed > policy.direction_epsilon {
                Direction::Favorable
            } else if signed < -policy.direction_epsilon {
                Direction::Unfavorable
            } else {
                Direction::Flat
            };
            Some((metric, direction, delta.abs()))
        })
        .collect();
    let count = |wanted: Direction| directions.iter().filter(|(_, d, _)| *d == wanted).count();
    let dominant = |wanted: Direction| {
        directions
            .iter()
            .filter(|(_, d, _)| *d == wanted)
            .map(|(_, _, magnitude)| *magnitude)
            .fold(0.0_f64, f64::max)
    };
    let favorable = count(Direction::Favorable);
    let unfavorable = count(Direction::Unfavorable);
    let burnout_rise = affected_metrics
        .get(&BehaviorMetric::BurnoutRiskScore)
        .copied()
        .unwrap_or(0.0);

    let (drift_type, magnitude) = if burnout_rise >= policy.burnout_spike {
        (DriftType::Burnout, burnout_rise / 100.0)
    } else if favorable >= policy.majority && unfavorable <= 1 {
        (DriftType::Improvement, dominant(Direction::Favorable))
    } else if unfavorable >= policy.majority && favorable <= 1 {
        (DriftType::Decline, dominant(Direction::Unfavorable))
    } else {
        (DriftType::Stagnation, aggregate)
    };
    let severity = Severity::from_magnitude(
        magnitude,
        policy.low_severity,
        policy.medium_severity,
        policy.high_severity,
    )
    .max(Severity::Low);

    let explanation = describe(drift_type, severity, days_between, &affected_metrics);
    debug!(?drift_type, %severity, days_between, aggregate, "behaviour drift detected");

    Ok(Some(DriftEvent {
        drift_type,
        severity,
        earlier: earlier.clone(),
        later: later.clone(),
        detected_on: detection_date,
        affected_metrics,
        explanation,
        days_between,
    }))
}

pub fn detect_drift_over_time(
    snapshots: &[BehaviorSnapshot],
    as_of: NaiveDate,
) -> Result<Vec<DriftEvent>> {
    detect_drift_over_time_with(snapshots, as_of, &DriftPolicy::default())
}

// Walks the history with a moving anchor: each anchor is paired with the
// first later snapshot at least one window away, which then becomes the
// next anchor. Snapshots dated after `as_of` are ignored.
pub fn detect_drift_over_time_with(
    snapshots: &[BehaviorSnapshot],
    as_of: NaiveDate,
    policy: &DriftPolicy,
) -> Result<Vec<DriftEvent>> {
    if let Some(pair) = snapshots.windows(2).find(|w| w[1].date() < w[0].date()) {
        return Err(TrajectoryError::precondition(format!(
            "snapshots are not chronological: {} follows {}",
            pair[1].date(),
            pair[0].date()
        )));
    }

    let visible: Vec<&BehaviorSnapshot> =
        snapshots.iter().filter(|s| s.date() <= as_of).collect();
    let min_gap = policy.min_window_days.max(1);

    let mut events = Vec::new();
    let mut anchor = 0;
    while anchor < visible.len() {
        let start = visible[anchor];
        let Some(offset) = visible[anchor + 1..]
            .iter()
            .position(|s| s.date().signed_duration_since(start.date()).num_days() >= min_gap)
        else {
            break;
        };
        let next = anchor + 1 + offset;
        if let Some(event) = detect_drift_with(start, visible[next], as_of, policy)? {
            events.push(event);
        }
        anchor = next;
    }

    debug!(
        snapshots = snapshots.len(),
        considered = visible.len(),
        events = events.len(),
        "drift history scanned"
    );
    Ok(events)
}

fn describe(
    drift_type: DriftType,
    severity: Severity,
    days_between: i64,
    deltas: &BTreeMap<BehaviorMetric, f64>,
) -> String {
    let headline = match drift_type {
        DriftType::Improvement => "Behaviour is improving across most tracked metrics",
        DriftType::Decline => "Behaviour is declining across most tracked metrics",
        DriftType::Burnout => "Burnout risk has risen sharply",
        DriftType::Stagnation => "Behaviour changed without a clear direction",
    };
    let changes: Vec<String> = deltas
        .iter()
        .map(|(metric, delta)| format!("{} {delta:+.2}", metric.as_str()))
        .collect();
    format!(
        "{headline} over {days_between} days ({severity} severity). Changes: {}.",
        changes.join(", ")
    )
}
