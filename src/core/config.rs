use serde::{Deserialize, Serialize};

use super::error::{Result, TrajectoryError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrajectoryConfig {
    pub simulation: SimulationModel,
    pub recommendation: RecommendationPolicy,
    pub scenario: ScenarioPolicy,
    pub effectiveness: EffectivenessPolicy,
    pub drift: DriftPolicy,
}

impl TrajectoryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TrajectoryError::invalid("config", format!("invalid JSON: {e}")))
    }
}

// Coefficients of the trajectory model. The formulas they feed are listed in
// `engine.rs`; every one is monotonic in the direction named by its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationModel {
    pub days_per_year: f64,
    pub activity_weight: f64,
    pub consistency_weight: f64,
    pub effort_soft_cap: f64,
    pub effort_excess_efficiency: f64,
    pub low_consistency_threshold: f64,
    pub low_consistency_overload_penalty: f64,
    pub warning_dampening: f64,
    pub difficulty_xp_step: f64,
    pub retention_floor: f64,
    pub streak_reference_days: f64,
    pub streak_retention_weight: f64,

    pub skill_goal_weight: f64,
    pub skill_difficulty_weight: f64,
    pub skill_consistency_weight: f64,
    pub goal_base_engagement: f64,
    pub goal_engagement_per_goal: f64,
    pub goal_engagement_max_goals: u32,
    pub goal_points_scale: f64,
    pub goal_points_weight: f64,
    pub no_goal_yearly_decay: f64,
    pub goal_yearly_gain: f64,
    pub consistency_pivot: f64,
    pub consistency_trend_weight: f64,
    pub activity_trend_weight: f64,
    pub warning_skill_drag: f64,

    pub effort_pressure_threshold: f64,
    pub effort_pressure_weight: f64,
    pub hard_habit_pressure: f64,
    pub hard_habit_volume: f64,
    pub warning_pressure_weight: f64,
    pub sustained_pressure_growth: f64,
    pub consistency_relief: f64,
    pub medium_pressure: f64,
    pub high_pressure: f64,

    pub income_base: f64,
    pub income_per_skill_point: f64,
    pub income_per_level: f64,
    pub income_low_ratio: f64,
    pub income_high_ratio: f64,

    pub emigration_income_reference: f64,
    pub emigration_steepness: f64,
    pub emigration_medium_burnout_factor: f64,
    pub emigration_high_burnout_factor: f64,
}

impl Default for SimulationModel {
    fn default() -> Self {
        Self {
            days_per_year: 365.0,
            activity_weight: 0.6,
            consistency_weight: 0.4,
            effort_soft_cap: 100.0,
            effort_excess_efficiency: 0.5,
            low_consistency_threshold: 50.0,
            low_consistency_overload_penalty: 0.10,
            warning_dampening: 0.15,
            difficulty_xp_step: 0.10,
            retention_floor: 0.85,
            streak_reference_days: 30.0,
            streak_retention_weight: 0.25,

            skill_goal_weight: 0.40,
            skill_difficulty_weight: 0.25,
            skill_consistency_weight: 0.35,
            goal_base_engagement: 0.5,
            goal_engagement_per_goal: 0.1,
            goal_engagement_max_goals: 5,
            goal_points_scale: 1_000.0,
            goal_points_weight: 0.2,
            no_goal_yearly_decay: 8.0,
            goal_yearly_gain: 2.0,
            consistency_pivot: 60.0,
            consistency_trend_weight: 10.0,
            activity_trend_weight: 5.0,
            warning_skill_drag: 0.1,

            effort_pressure_threshold: 80.0,
            effort_pressure_weight: 30.0,
            hard_habit_pressure: 16.0,
            hard_habit_volume: 5.0,
            warning_pressure_weight: 0.3,
            sustained_pressure_growth: 0.1,
            consistency_relief: 0.5,
            medium_pressure: 15.0,
            high_pressure: 30.0,

            income_base: 20_000.0,
            income_per_skill_point: 550.0,
            income_per_level: 300.0,
            income_low_ratio: 0.8,
            income_high_ratio: 1.25,

            emigration_income_reference: 80_000.0,
            emigration_steepness: 2.5,
            emigration_medium_burnout_factor: 0.85,
            emigration_high_burnout_factor: 0.65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationPolicy {
    pub high_first_year_skill: f64,
    pub low_skill: f64,
    pub very_low_skill: f64,
    pub moderate_skill_upper: f64,
    pub plateau_drop: f64,
    pub steep_decline_rate: f64,
    pub low_growth_rate: f64,
    pub consistency_limit_skill: f64,
    pub goal_engagement_skill: f64,
    pub goal_refresh_drop: f64,

    pub reduce_burnout_priority: f64,
    pub adjust_difficulty_priority: f64,
    pub balance_effort_priority: f64,
    pub goal_focus_priority: f64,
    pub add_habits_priority: f64,
    pub optimize_strategy_priority: f64,
    pub plateau_priority: f64,
    pub declining_growth_priority: f64,
    pub low_baseline_priority: f64,
    pub consistency_limit_priority: f64,
    pub goal_engagement_priority: f64,
    pub goal_refresh_priority: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            high_first_year_skill: 60.0,
            low_skill: 30.0,
            very_low_skill: 20.0,
            moderate_skill_upper: 50.0,
            plateau_drop: 10.0,
            steep_decline_rate: -10.0,
            low_growth_rate: 5.0,
            consistency_limit_skill: 60.0,
            goal_engagement_skill: 40.0,
            goal_refresh_drop: 5.0,

            reduce_burnout_priority: 90.0,
            adjust_difficulty_priority: 75.0,
            balance_effort_priority: 60.0,
            goal_focus_priority: 85.0,
            add_habits_priority: 70.0,
            optimize_strategy_priority: 50.0,
            plateau_priority: 80.0,
            declining_growth_priority: 85.0,
            low_baseline_priority: 75.0,
            consistency_limit_priority: 55.0,
            goal_engagement_priority: 70.0,
            goal_refresh_priority: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioPolicy {
    pub burnout_effort_factor: f64,
    pub consistency_boost: f64,
    pub active_days_boost: u32,
    pub streak_boost: f64,
    pub goal_focus_effort_factor: f64,
    pub focus_goal_xp_reward: u64,
    pub difficulty_effort_factor: f64,
    pub extra_habits: u32,
    pub growth_effort_factor: f64,
    pub balance_effort_factor: f64,
    pub balance_consistency_boost: f64,
    pub strategy_consistency_boost: f64,
    pub strategy_active_days_boost: u32,
    pub combine_multiple: bool,
}

impl Default for ScenarioPolicy {
    fn default() -> Self {
        Self {
            burnout_effort_factor: 0.8,
            consistency_boost: 15.0,
            active_days_boost: 5,
            streak_boost: 3.0,
            goal_focus_effort_factor: 1.1,
            focus_goal_xp_reward: 500,
            difficulty_effort_factor: 0.95,
            extra_habits: 2,
            growth_effort_factor: 1.1,
            balance_effort_factor: 0.9,
            balance_consistency_boost: 5.0,
            strategy_consistency_boost: 10.0,
            strategy_active_days_boost: 3,
            combine_multiple: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectivenessPolicy {
    pub poor_match_score: f64,
    pub xp_weight: f64,
    pub skill_weight: f64,
    pub burnout_weight: f64,
    pub low_deviation: f64,
    pub medium_deviation: f64,
    pub high_deviation: f64,
    pub compliance_fraction: f64,
    pub overshoot_margin: f64,
}

impl Default for EffectivenessPolicy {
    fn default() -> Self {
        Self {
            poor_match_score: 70.0,
            xp_weight: 0.4,
            skill_weight: 0.4,
            burnout_weight: 0.2,
            low_deviation: 0.05,
            medium_deviation: 0.15,
            high_deviation: 0.30,
            compliance_fraction: 0.25,
            overshoot_margin: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriftPolicy {
    pub min_window_days: i64,
    pub significance: f64,
    pub burnout_spike: f64,
    pub direction_epsilon: f64,
    pub majority: usize,
    pub low_severity: f64,
    pub medium_severity: f64,
    pub high_severity: f64,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            min_window_days: 30,
            significance: 0.05,
            burnout_spike: 20.0,
            direction_epsilon: 0.02,
            majority: 3,
            low_severity: 0.05,
            medium_severity: 0.15,
            high_severity: 0.30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = TrajectoryConfig::from_json(r#"{"drift":{"minWindowDays":14}}"#)
            .expect("valid config");
        assert_eq!(config.drift.min_window_days, 14);
        assert_eq!(config.drift.significance, DriftPolicy::default().significance);
        assert_eq!(config.simulation, SimulationModel::default());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = TrajectoryConfig::from_json("{not json").expect_err("must reject");
        assert!(matches!(err, TrajectoryError::InvalidField { field: "config", .. }));
    }
}
