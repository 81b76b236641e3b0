use tracing::{debug, trace};

use super::config::SimulationModel;
use super::error::Result;
use super::explain::explain;
use super::levels::{LevelCurve, StandardLevelCurve};
use super::types::{
    BurnoutRisk, IncomeRange, SimulationInput, SimulationResult, TrajectoryView,
    YearlyProjection,
};

// Model, per simulated year y = 1..N (c = consistency / 100, a = active days / 30,
// s = min(1, average streak / streak_reference_days)):
//
//   active_fraction = activity_weight * a + consistency_weight * c
//   effort          = soft-capped daily effort, damped by warning severity and by
//                     overload under low consistency
//   xp_gain(y)      = effort * difficulty_multiplier * days * active_fraction
//                     * retention^(y - 1)
//   retention       = floor + (1 - floor) * ((1 - w) * c + w * s),   w = streak_retention_weight
//   skill(y)        = base_skill + trend * (y - 1) - warning drag, clamped to [0, 100]
//   pressure(y)     = (effort overload + hard-habit load + warning) * (1 + growth * (y - 1))
//   burnout tier    = mean pressure * (1 - relief * c) against medium/high bands,
//                     escalated one tier when a warning is active
//   income          = base + per_skill * skill(N) + per_level * level(N), scaled to p25/p75
//   emigration      = 100 * (1 - e^(-k * skill/100 * min(1, income / reference)))
//                     * burnout factor

pub fn simulate(input: &SimulationInput) -> Result<SimulationResult> {
    simulate_with(input, &SimulationModel::default(), &StandardLevelCurve)
}

pub fn simulate_with(
    input: &SimulationInput,
    model: &SimulationModel,
    levels: &dyn LevelCurve,
) -> Result<SimulationResult> {
    let drivers = Drivers::from_input(input, model);
    let years = input.years_to_simulate();

    let mut projections = Vec::with_capacity(years as usize);
    let mut xp = input.total_xp();
    let mut pressure_total = 0.0;

    for year in 1..=years {
        let gain = yearly_xp_gain(&drivers, model, year);
        let next_xp = xp.saturating_add(gain.round() as u64);
        let growth_rate = xp_growth_rate(xp, next_xp);
        let skill = skill_growth_index(&drivers, model, year);
        let pressure = yearly_pressure(&drivers, model, year);
        pressure_total += pressure;

        trace!(year, gain, next_xp, growth_rate, skill, pressure, "projected year");

        projections.push(YearlyProjection::new(
            year,
            next_xp,
            levels.level_for(next_xp),
            skill,
            growth_rate,
        )?);
        xp = next_xp;
    }

    let average_skill_growth = projections
        .iter()
        .map(YearlyProjection::skill_growth_index)
        .sum::<f64>()
        / projections.len() as f64;
    let burnout_risk = classify_burnout(pressure_total / years as f64, &drivers, model);

    let (final_skill, final_level) = projections
        .last()
        .map(|p| (p.skill_growth_index(), p.projected_level()))
        .unwrap_or((0.0, 1));
    let income_range = project_income(final_skill, final_level, model)?;
    let emigration_probability =
        emigration_probability(final_skill, &income_range, burnout_risk, model);

    let explanation = explain(
        TrajectoryView {
            projections: &projections,
            average_skill_growth,
            burnout_risk,
            income_range: &income_range,
            emigration_probability,
        },
        input.habits_consistency_score(),
    )?;

    debug!(
        years,
        final_xp = xp,
        average_skill_growth,
        %burnout_risk,
        emigration_probability,
        "simulated trajectory"
    );

    SimulationResult::new(
        projections,
        average_skill_growth,
        burnout_risk,
        income_range,
        emigration_probability,
        explanation,
    )
}

#[derive(Debug, Clone, Copy)]
struct Drivers {
    consistency: f64,
    activity: f64,
    active_fraction: f64,
    raw_effort: f64,
    effective_effort: f64,
    difficulty_multiplier: f64,
    difficulty_share: f64,
    hard_share: f64,
    habit_volume: f64,
    retention: f64,
    goal_engagement: f64,
    has_goals: bool,
    warning_active: bool,
    warning_severity: f64,
}

impl Drivers {
    fn from_input(input: &SimulationInput, model: &SimulationModel) -> Self {
        let consistency = input.habits_consistency_score() / 100.0;
        let activity = (input.active_days_last_month() as f64 / 30.0).min(1.0);
        let active_fraction =
            (model.activity_weight * activity + model.consistency_weight * consistency)
                .clamp(0.0, 1.0);

        let streak = if model.streak_reference_days > 0.0 {
            (input.average_streak_length() / model.streak_reference_days).min(1.0)
        } else {
            1.0
        };
        let streak_weight = model.streak_retention_weight.clamp(0.0, 1.0);
        let habit_hold = (1.0 - streak_weight) * consistency + streak_weight * streak;

        let raw_effort = input.average_daily_effort();
        let warning_severity = input.warning_severity();
        let effective_effort =
            effective_effort(raw_effort, input.habits_consistency_score(), warning_severity, model);

        let habits = input.habit_count();
        let mean_difficulty = input.mean_difficulty();
        let difficulty_multiplier = mean_difficulty
            .map(|d| 1.0 + model.difficulty_xp_step * (d - 3.0))
            .unwrap_or(1.0);
        let difficulty_share = mean_difficulty.map(|d| d / 5.0).unwrap_or(0.0);
        let (hard_share, habit_volume) = if habits == 0 {
            (0.0, 0.0)
        } else {
            (
                input.hard_habit_count() as f64 / habits as f64,
                (habits as f64 / model.hard_habit_volume.max(1.0)).min(1.0),
            )
        };

        let goals = input.active_goals();
        let goal_engagement = if goals.is_empty() {
            0.0
        } else {
            let counted = goals.len().min(model.goal_engagement_max_goals as usize) as f64;
            let points = (input.goal_xp_total() as f64 / model.goal_points_scale.max(1.0)).min(1.0);
            (model.goal_base_engagement
                + model.goal_engagement_per_goal * counted
                + model.goal_points_weight * points)
                .min(1.0)
        };

        Self {
            consistency,
            activity,
            active_fraction,
            raw_effort,
            effective_effort,
            difficulty_multiplier,
            difficulty_share,
            hard_share,
            habit_volume,
            retention: model.retention_floor + (1.0 - model.retention_floor) * habit_hold,
            goal_engagement,
            has_goals: !goals.is_empty(),
            warning_active: input.burnout_warning().active,
            warning_severity,
        }
    }
}

fn effective_effort(
    raw_effort: f64,
    consistency_score: f64,
    warning_severity: f64,
    model: &SimulationModel,
) -> f64 {
    let capped = if raw_effort > model.effort_soft_cap {
        model.effort_soft_cap + (raw_effort - model.effort_soft_cap) * model.effort_excess_efficiency
    } else {
        raw_effort
    };

    let mut dampening = 1.0 - model.warning_dampening * warning_severity / 100.0;
    if raw_effort > model.effort_soft_cap && consistency_score < model.low_consistency_threshold {
        dampening -= model.low_consistency_overload_penalty;
    }
    capped * dampening.max(0.0)
}

fn yearly_xp_gain(drivers: &Drivers, model: &SimulationModel, year: u32) -> f64 {
    let base = drivers.effective_effort
        * drivers.difficulty_multiplier
        * model.days_per_year
        * drivers.active_fraction;
    (base * drivers.retention.powi(year as i32 - 1)).max(0.0)
}

fn xp_growth_rate(previous: u64, next: u64) -> f64 {
    if previous == 0 {
        return if next > 0 { 100.0 } else { 0.0 };
    }
    (next as f64 - previous as f64) / previous as f64 * 100.0
}

fn skill_growth_index(drivers: &Drivers, model: &SimulationModel, year: u32) -> f64 {
    let consistency_component = 0.7 * drivers.consistency + 0.3 * drivers.activity;
    let base = 100.0
        * (model.skill_goal_weight * drivers.goal_engagement
            + model.skill_difficulty_weight * drivers.difficulty_share
            + model.skill_consistency_weight * consistency_component);

    let goal_trend = if drivers.has_goals {
        model.goal_yearly_gain * drivers.goal_engagement
    } else {
        -model.no_goal_yearly_decay
    };
    let pivot = model.consistency_pivot / 100.0;
    let trend = goal_trend
        + (drivers.consistency - pivot) * model.consistency_trend_weight
        + (drivers.activity - pivot) * model.activity_trend_weight;

    let drag = model.warning_skill_drag * drivers.warning_severity;
    (base + trend * (year - 1) as f64 - drag).clamp(0.0, 100.0)
}

fn yearly_pressure(drivers: &Drivers, model: &SimulationModel, year: u32) -> f64 {
    let overload = (drivers.raw_effort - model.effort_pressure_threshold).max(0.0) / 100.0
        * model.effort_pressure_weight;
    let hard_load = model.hard_habit_pressure * drivers.hard_share * drivers.habit_volume;
    let warning = model.warning_pressure_weight * drivers.warning_severity;
    let sustained = 1.0 + model.sustained_pressure_growth * (year - 1) as f64;
    (overload + hard_load + warning) * sustained
}

fn classify_burnout(mean_pressure: f64, drivers: &Drivers, model: &SimulationModel) -> BurnoutRisk {
    let score = mean_pressure * (1.0 - model.consistency_relief * drivers.consistency);
    let tier = if score >= model.high_pressure {
        BurnoutRisk::High
    } else if score >= model.medium_pressure {
        BurnoutRisk::Medium
    } else {
        BurnoutRisk::Low
    };
    if drivers.warning_active {
        tier.escalate()
    } else {
        tier
    }
}

fn project_income(skill: f64, level: u32, model: &SimulationModel) -> Result<IncomeRange> {
    let expected = (model.income_base
        + model.income_per_skill_point * skill
        + model.income_per_level * level as f64)
        .max(0.0);
    let low = expected * model.income_low_ratio.clamp(0.0, 1.0);
    let high = expected * model.income_high_ratio.max(1.0);
    IncomeRange::new(low, expected, high)
}

fn emigration_probability(
    skill: f64,
    income: &IncomeRange,
    burnout_risk: BurnoutRisk,
    model: &SimulationModel,
) -> f64 {
    let income_factor = if model.emigration_income_reference > 0.0 {
        (income.expected() / model.emigration_income_reference).min(1.0)
    } else {
        1.0
    };
    let potential = skill / 100.0 * income_factor;
    let sustainability = match burnout_risk {
        BurnoutRisk::Low => 1.0,
        BurnoutRisk::Medium => model.emigration_medium_burnout_factor,
        BurnoutRisk::High => model.emigration_high_burnout_factor,
    };
    (100.0 * (1.0 - (-model.emigration_steepness * potential).exp()) * sustainability)
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{assert_approx, overloaded_draft, sample_draft, sample_input};
    use crate::core::types::{ActiveGoal, BurnoutWarning, Difficulty, SimulationInputDraft};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use std::collections::BTreeMap;

    fn build(draft: SimulationInputDraft) -> SimulationInput {
        SimulationInput::try_from(draft).expect("valid input")
    }

    #[test]
    fn reference_input_projects_growing_low_risk_trajectory() {
        let result = simulate(&sample_input()).expect("simulation succeeds");

        let projections = result.yearly_projections();
        assert_eq!(projections.len(), 3);
        assert!(projections[0].projected_xp() > 500);
        for pair in projections.windows(2) {
            assert!(pair[1].projected_xp() > pair[0].projected_xp());
            assert!(pair[1].projected_level() >= pair[0].projected_level());
        }
        assert_eq!(result.burnout_risk(), BurnoutRisk::Low);
        assert!(!result.explanation().trim().is_empty());
        assert_eq!(projections[0].year(), 1);
        assert_eq!(projections[2].year(), 3);
    }

    #[test]
    fn simulation_is_deterministic() {
        let input = build(overloaded_draft());
        let a = simulate(&input).expect("first run");
        let b = simulate(&input).expect("second run");
        assert_eq!(a, b);
    }

    #[test]
    fn overload_with_warning_raises_burnout_risk() {
        let result = simulate(&build(overloaded_draft())).expect("simulation succeeds");
        assert!(matches!(result.burnout_risk(), BurnoutRisk::Medium | BurnoutRisk::High));
    }

    #[test]
    fn active_warning_raises_risk_at_least_one_tier() {
        let mut draft = sample_draft();
        draft.burnout_warning = BurnoutWarning::active(5.0, vec!["tired".to_string()]);
        let result = simulate(&build(draft)).expect("simulation succeeds");
        assert!(result.burnout_risk() >= BurnoutRisk::Medium);
    }

    #[test]
    fn empty_goals_and_habits_still_produce_low_growth_result() {
        let mut draft = sample_draft();
        draft.habits_by_difficulty.clear();
        draft.active_goals.clear();
        draft.average_daily_effort = 0.0;
        draft.active_days_last_month = 0;
        draft.habits_consistency_score = 0.0;
        draft.total_xp = 0;

        let result = simulate(&build(draft)).expect("simulation succeeds");
        assert_eq!(result.yearly_projections().len(), 3);
        assert!(result.average_skill_growth() < 10.0);
        assert_eq!(result.final_projection().projected_xp(), 0);
        assert_eq!(result.final_projection().projected_level(), 1);
        assert_eq!(result.first_projection().xp_growth_rate(), 0.0);
    }

    #[test]
    fn skill_growth_declines_without_goals_and_with_weak_consistency() {
        let mut draft = sample_draft();
        draft.active_goals.clear();
        draft.habits_consistency_score = 35.0;
        draft.active_days_last_month = 10;
        draft.years_to_simulate = 4;

        let result = simulate(&build(draft)).expect("simulation succeeds");
        let first = result.first_projection().skill_growth_index();
        let last = result.final_projection().skill_growth_index();
        assert!(last < first, "expected decline, got {first} -> {last}");
    }

    #[test]
    fn goals_lift_skill_growth() {
        let mut with_goals = sample_draft();
        with_goals.active_goals.push(ActiveGoal {
            title: "Ship a side project".to_string(),
            xp_reward: 800,
        });
        let mut without_goals = sample_draft();
        without_goals.active_goals.clear();

        let with_goals = simulate(&build(with_goals)).expect("simulation succeeds");
        let without_goals = simulate(&build(without_goals)).expect("simulation succeeds");
        assert!(with_goals.average_skill_growth() > without_goals.average_skill_growth());
    }

    #[test]
    fn effort_beyond_soft_cap_has_diminishing_returns() {
        let model = SimulationModel::default();
        let at_cap = effective_effort(100.0, 80.0, 0.0, &model);
        let doubled = effective_effort(200.0, 80.0, 0.0, &model);
        assert!(doubled > at_cap);
        assert!(doubled - at_cap < at_cap);

        let low_consistency = effective_effort(200.0, 20.0, 0.0, &model);
        assert!(low_consistency < doubled);
        let warned = effective_effort(200.0, 80.0, 60.0, &model);
        assert!(warned < doubled);
    }

    #[test]
    fn growth_rate_uses_pre_simulation_xp_for_first_year() {
        assert_eq!(xp_growth_rate(0, 0), 0.0);
        assert_eq!(xp_growth_rate(0, 10), 100.0);
        assert_approx(xp_growth_rate(200, 250), 25.0);
    }

    #[test]
    fn longer_streaks_hold_more_of_each_years_gain() {
        let mut short = sample_draft();
        short.average_streak_length = 2.0;
        let mut long = sample_draft();
        long.average_streak_length = 300.0;

        let short = simulate(&build(short)).expect("simulation succeeds");
        let long = simulate(&build(long)).expect("simulation succeeds");
        assert_eq!(
            short.first_projection().projected_xp(),
            long.first_projection().projected_xp()
        );
        assert!(long.final_projection().projected_xp() > short.final_projection().projected_xp());
    }

    #[test]
    fn custom_level_curve_is_used_for_projected_levels() {
        struct Flat;
        impl LevelCurve for Flat {
            fn level_for(&self, _total_xp: u64) -> u32 {
                7
            }
        }

        let result = simulate_with(&sample_input(), &SimulationModel::default(), &Flat)
            .expect("simulation succeeds");
        assert!(result.yearly_projections().iter().all(|p| p.projected_level() == 7));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_simulation_invariants_hold(
            total_xp in 0u64..2_000_000,
            consistency in 0u32..=100,
            effort in 0u32..400,
            easy in 0u32..6,
            medium in 0u32..6,
            hard in 0u32..6,
            goals in 0usize..4,
            goal_reward in 0u64..3_000,
            warning in proptest::bool::ANY,
            severity in 0u32..=100,
            active_days in 0u32..=31,
            years in 1u32..=5
        ) {
            let draft = SimulationInputDraft {
                total_xp,
                level: 1,
                habits_consistency_score: consistency as f64,
                average_daily_effort: effort as f64,
                habits_by_difficulty: BTreeMap::from([
                    (Difficulty::One, easy),
                    (Difficulty::Three, medium),
                    (Difficulty::Five, hard),
                ]),
                active_goals: (0..goals)
                    .map(|i| ActiveGoal { title: format!("goal {i}"), xp_reward: goal_reward })
                    .collect(),
                burnout_warning: BurnoutWarning {
                    active: warning,
                    reasons: vec![],
                    severity: severity as f64,
                },
                active_days_last_month: active_days,
                average_streak_length: 3.0,
                years_to_simulate: years,
            };
            let input = build(draft);
            let result = simulate(&input).expect("simulation succeeds");
            let again = simulate(&input).expect("simulation succeeds");
            prop_assert_eq!(&result, &again);

            prop_assert_eq!(result.yearly_projections().len(), years as usize);
            let mut prev = total_xp;
            for p in result.yearly_projections() {
                prop_assert!(p.projected_xp() >= prev);
                prop_assert!((0.0..=100.0).contains(&p.skill_growth_index()));
                prev = p.projected_xp();
            }
            let income = result.income_range();
            prop_assert!(0.0 <= income.low());
            prop_assert!(income.low() <= income.expected());
            prop_assert!(income.expected() <= income.high());
            prop_assert!((0.0..=100.0).contains(&result.emigration_probability()));
            prop_assert!((0.0..=100.0).contains(&result.average_skill_growth()));
            if warning {
                prop_assert!(result.burnout_risk() >= BurnoutRisk::Medium);
            }
        }

        #[test]
        fn prop_high_consistency_moderate_effort_stays_low_risk(
            consistency in 85u32..=100,
            effort in 0u32..=85,
            easy in 0u32..4,
            medium in 0u32..4,
            hard in 0u32..4,
            years in 1u32..=5
        ) {
            let mut draft = sample_draft();
            draft.habits_consistency_score = consistency as f64;
            draft.average_daily_effort = effort as f64;
            draft.habits_by_difficulty = BTreeMap::from([
                (Difficulty::Two, easy),
                (Difficulty::Three, medium),
                (Difficulty::Five, hard),
            ]);
            draft.years_to_simulate = years;
            let result = simulate(&build(draft)).expect("simulation succeeds");
            prop_assert_eq!(result.burnout_risk(), BurnoutRisk::Low);
        }
    }
}
