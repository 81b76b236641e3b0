use std::collections::BTreeMap;

use rayon::prelude::*;
use serde_json::json;
use tracing::debug;

use super::config::{ScenarioPolicy, SimulationModel};
use super::engine::simulate_with;
use super::error::{Result, TrajectoryError};
use super::levels::{LevelCurve, StandardLevelCurve};
use super::types::{
    ActiveGoal, BurnoutWarning, Difficulty, GeneratedScenario, Recommendation,
    RecommendationType, ScenarioImpactSummary, SimulationInput, SimulationInputDraft,
    SimulationResult,
};

pub const COMBINED_SCENARIO_NAME: &str = "Combined Improvements";

pub fn scenario_name(kind: RecommendationType) -> &'static str {
    match kind {
        RecommendationType::ReduceBurnoutRisk => "Burnout Risk Reduction",
        RecommendationType::ImproveConsistency => "Consistency Boost",
        RecommendationType::AddGoalFocus => "Goal Focus",
        RecommendationType::AdjustHabitDifficulty => "Difficulty Rebalance",
        RecommendationType::AddHabitsForGrowth => "Habit Expansion",
        RecommendationType::BalanceEffort => "Balanced Effort",
        RecommendationType::OptimizeStrategy => "Strategy Optimization",
    }
}

pub fn generate_scenarios(
    input: &SimulationInput,
    recommendations: &[Recommendation],
) -> Result<Vec<GeneratedScenario>> {
    generate_scenarios_with(input, recommendations, &ScenarioPolicy::default())
}

// One scenario per recommendation type (in order of first appearance), plus
// a combined scenario when more than one type is present and the policy
// allows it.
pub fn generate_scenarios_with(
    input: &SimulationInput,
    recommendations: &[Recommendation],
    policy: &ScenarioPolicy,
) -> Result<Vec<GeneratedScenario>> {
    if recommendations.is_empty() {
        return Err(TrajectoryError::precondition(
            "scenario generation needs at least one recommendation",
        ));
    }

    let groups = group_by_kind(recommendations);
    let mut scenarios = Vec::with_capacity(groups.len() + 1);

    for (kind, group) in &groups {
        let mut draft = input.to_draft();
        apply_adjustment(*kind, &mut draft, policy);
        let modified = SimulationInput::try_from(draft)?;
        scenarios.push(GeneratedScenario::new(
            scenario_name(*kind),
            group.clone(),
            modified,
            rationale(group),
            expected_benefit(*kind, &group[0], input.years_to_simulate()),
        )?);
    }

    if policy.combine_multiple && groups.len() > 1 {
        let mut draft = input.to_draft();
        for (kind, _) in &groups {
            apply_adjustment(*kind, &mut draft, policy);
        }
        let modified = SimulationInput::try_from(draft)?;
        let names: Vec<&str> = groups.iter().map(|(kind, _)| scenario_name(*kind)).collect();
        scenarios.push(GeneratedScenario::new(
            COMBINED_SCENARIO_NAME,
            recommendations.to_vec(),
            modified,
            format!("Applies every adjustment together: {}.", names.join(", ")),
            json!({
                "focus": "combined",
                "includes": names,
                "horizonYears": input.years_to_simulate(),
                "expectedEffect": "Compounded benefit of all recommended changes adopted at once.",
            }),
        )?);
    }

    debug!(
        recommendations = recommendations.len(),
        scenarios = scenarios.len(),
        "generated scenarios"
    );
    Ok(scenarios)
}

fn group_by_kind(recommendations: &[Recommendation]) -> Vec<(RecommendationType, Vec<Recommendation>)> {
    let mut groups: Vec<(RecommendationType, Vec<Recommendation>)> = Vec::new();
    for rec in recommendations {
        match groups.iter_mut().find(|(kind, _)| *kind == rec.kind()) {
            Some((_, group)) => group.push(rec.clone()),
            None => groups.push((rec.kind(), vec![rec.clone()])),
        }
    }
    groups
}

fn rationale(group: &[Recommendation]) -> String {
    let reasons: Vec<&str> = group.iter().map(Recommendation::reason).collect();
    format!("What if you followed this advice? {}", reasons.join(" "))
}

fn expected_benefit(
    kind: RecommendationType,
    primary: &Recommendation,
    years: u32,
) -> serde_json::Value {
    json!({
        "focus": scenario_name(kind),
        "horizonYears": years,
        "expectedEffect": primary.expected_benefit(),
    })
}

fn apply_adjustment(kind: RecommendationType, draft: &mut SimulationInputDraft, policy: &ScenarioPolicy) {
    match kind {
        RecommendationType::ReduceBurnoutRisk => {
            draft.average_daily_effort *= policy.burnout_effort_factor;
            ease_habits(&mut draft.habits_by_difficulty, Difficulty::is_hard);
            draft.burnout_warning = BurnoutWarning::none();
        }
        RecommendationType::ImproveConsistency => {
            boost_consistency(draft, policy.consistency_boost);
            boost_active_days(draft, policy.active_days_boost);
            draft.average_streak_length += policy.streak_boost;
        }
        RecommendationType::AddGoalFocus => {
            draft.active_goals.push(ActiveGoal {
                title: "Focused growth goal".to_string(),
                xp_reward: policy.focus_goal_xp_reward,
            });
            draft.average_daily_effort *= policy.goal_focus_effort_factor;
        }
        RecommendationType::AdjustHabitDifficulty => {
            ease_habits(&mut draft.habits_by_difficulty, |d| d == Difficulty::Five);
            draft.average_daily_effort *= policy.difficulty_effort_factor;
        }
        RecommendationType::AddHabitsForGrowth => {
            *draft
                .habits_by_difficulty
                .entry(Difficulty::Three)
                .or_insert(0) += policy.extra_habits;
            draft.average_daily_effort *= policy.growth_effort_factor;
        }
        RecommendationType::BalanceEffort => {
            draft.average_daily_effort *= policy.balance_effort_factor;
            boost_consistency(draft, policy.balance_consistency_boost);
        }
        RecommendationType::OptimizeStrategy => {
            boost_consistency(draft, policy.strategy_consistency_boost);
            boost_active_days(draft, policy.strategy_active_days_boost);
        }
    }
}

fn ease_habits(habits: &mut BTreeMap<Difficulty, u32>, should_ease: impl Fn(Difficulty) -> bool) {
    let mut eased = BTreeMap::new();
    for (difficulty, count) in habits.iter() {
        let target = if should_ease(*difficulty) {
            difficulty.easier()
        } else {
            *difficulty
        };
        *eased.entry(target).or_insert(0) += count;
    }
    *habits = eased;
}

fn boost_consistency(draft: &mut SimulationInputDraft, boost: f64) {
    draft.habits_consistency_score = (draft.habits_consistency_score + boost).min(100.0);
}

fn boost_active_days(draft: &mut SimulationInputDraft, boost: u32) {
    draft.active_days_last_month = (draft.active_days_last_month + boost).min(31);
}

pub fn evaluate_scenarios(
    base_input: &SimulationInput,
    base_result: &SimulationResult,
    scenarios: &[GeneratedScenario],
) -> Result<Vec<ScenarioImpactSummary>> {
    evaluate_scenarios_with(
        base_input,
        base_result,
        scenarios,
        &SimulationModel::default(),
        &StandardLevelCurve,
    )
}

// Re-simulates every scenario in parallel. The output keeps the order of
// `scenarios`.
pub fn evaluate_scenarios_with(
    base_input: &SimulationInput,
    base_result: &SimulationResult,
    scenarios: &[GeneratedScenario],
    model: &SimulationModel,
    levels: &dyn LevelCurve,
) -> Result<Vec<ScenarioImpactSummary>> {
    let years = base_input.years_to_simulate() as usize;
    if base_result.yearly_projections().len() != years {
        return Err(TrajectoryError::precondition(format!(
            "baseline result covers {} years but the baseline input asks for {years}",
            base_result.yearly_projections().len()
        )));
    }
    if let Some(scenario) = scenarios
        .iter()
        .find(|s| s.modified_input().years_to_simulate() as usize != years)
    {
        return Err(TrajectoryError::precondition(format!(
            "scenario '{}' simulates a different horizon than the baseline",
            scenario.name()
        )));
    }

    let summaries = scenarios
        .par_iter()
        .map(|scenario| {
            let improved = simulate_with(scenario.modified_input(), model, levels)?;
            ScenarioImpactSummary::new(scenario.clone(), base_result.clone(), improved)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(scenarios = summaries.len(), "evaluated scenarios");
    Ok(summaries)
}
