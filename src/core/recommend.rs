use tracing::debug;

use super::config::RecommendationPolicy;
use super::error::Result;
use super::types::{BurnoutRisk, Impact, Recommendation, RecommendationType, SimulationResult};

type Rule = fn(&SimulationResult, &RecommendationPolicy) -> Result<Vec<Recommendation>>;

const RULES: [Rule; 6] = [
    burnout_rule,
    skill_level_rule,
    plateau_rule,
    growth_rate_rule,
    consistency_limit_rule,
    goal_engagement_rule,
];

pub fn recommend(result: &SimulationResult) -> Result<Vec<Recommendation>> {
    recommend_with(result, &RecommendationPolicy::default())
}

// Runs every rule in order and sorts by descending priority. The sort is
// stable, so equal priorities keep rule order.
pub fn recommend_with(
    result: &SimulationResult,
    policy: &RecommendationPolicy,
) -> Result<Vec<Recommendation>> {
    let mut recommendations = Vec::new();
    for rule in RULES {
        recommendations.extend(rule(result, policy)?);
    }
    recommendations.sort_by(|a, b| b.priority_score().total_cmp(&a.priority_score()));

    debug!(
        count = recommendations.len(),
        top = ?recommendations.first().map(Recommendation::kind),
        "generated recommendations"
    );
    Ok(recommendations)
}

fn burnout_rule(result: &SimulationResult, policy: &RecommendationPolicy) -> Result<Vec<Recommendation>> {
    let mut out = Vec::new();
    match result.burnout_risk() {
        BurnoutRisk::High => {
            out.push(Recommendation::new(
                RecommendationType::ReduceBurnoutRisk,
                "Scale back daily effort and schedule deliberate recovery days.",
                "The projected workload carries a high burnout risk.",
                "A sustainable pace protects long-term XP growth and avoids a collapse in activity.",
                "Progress may feel slower for a few weeks while the load comes down.",
                Impact::High,
                policy.reduce_burnout_priority,
            )?);
            let first_skill = result.first_projection().skill_growth_index();
            if first_skill > policy.high_first_year_skill {
                out.push(Recommendation::new(
                    RecommendationType::AdjustHabitDifficulty,
                    "Swap some of the hardest habits for slightly easier variants.",
                    format!(
                        "First-year skill growth is strong ({first_skill:.1}) but the difficulty mix is driving burnout."
                    ),
                    "Keeps most of the skill gains while lowering the strain behind them.",
                    "Skill growth may dip slightly in the short term.",
                    Impact::Medium,
                    policy.adjust_difficulty_priority,
                )?);
            }
        }
        BurnoutRisk::Medium => {
            out.push(Recommendation::new(
                RecommendationType::BalanceEffort,
                "Spread effort more evenly across the week and cap the busiest days.",
                "Burnout risk is medium and could escalate under the current pattern.",
                "Smoother effort keeps momentum without tipping into burnout.",
                "",
                Impact::Medium,
                policy.balance_effort_priority,
            )?);
        }
        BurnoutRisk::Low => {}
    }
    Ok(out)
}

fn skill_level_rule(result: &SimulationResult, policy: &RecommendationPolicy) -> Result<Vec<Recommendation>> {
    let average = result.average_skill_growth();
    let mut out = Vec::new();
    if average < policy.low_skill {
        out.push(Recommendation::new(
            RecommendationType::AddGoalFocus,
            "Set one or two concrete goals that your daily habits feed into.",
            format!("Average skill growth is low ({average:.1}); activity is not turning into capability."),
            "Goal-directed practice lifts the skill-growth index and the income outlook.",
            "",
            Impact::High,
            policy.goal_focus_priority,
        )?);
        if average < policy.very_low_skill {
            out.push(Recommendation::new(
                RecommendationType::AddHabitsForGrowth,
                "Add a couple of habits that practise a skill you want to build.",
                format!("Average skill growth is very low ({average:.1})."),
                "Skill-building habits give the trajectory a base to grow from.",
                "More habits add load; start small and keep consistency first.",
                Impact::Medium,
                policy.add_habits_priority,
            )?);
        }
    } else if average < policy.moderate_skill_upper {
        out.push(Recommendation::new(
            RecommendationType::OptimizeStrategy,
            "Review which habits actually move your goals and drop the rest.",
            format!("Average skill growth is moderate ({average:.1}); there is headroom in how effort is spent."),
            "Redirecting effort toward high-value habits raises skill growth without more work.",
            "",
            Impact::Low,
            policy.optimize_strategy_priority,
        )?);
    }
    Ok(out)
}

fn plateau_rule(result: &SimulationResult, policy: &RecommendationPolicy) -> Result<Vec<Recommendation>> {
    if result.yearly_projections().len() < 2 {
        return Ok(Vec::new());
    }
    let first = result.first_projection().skill_growth_index();
    let last = result.final_projection().skill_growth_index();
    if first - last <= policy.plateau_drop {
        return Ok(Vec::new());
    }
    Ok(vec![Recommendation::new(
        RecommendationType::AddGoalFocus,
        "Refresh your goals before skill growth flattens out.",
        format!("Skill growth falls from {first:.1} to {last:.1} over the projection, a plateau risk."),
        "New goal targets restart the learning curve and keep growth compounding.",
        "",
        Impact::High,
        policy.plateau_priority,
    )?])
}

fn growth_rate_rule(result: &SimulationResult, policy: &RecommendationPolicy) -> Result<Vec<Recommendation>> {
    let first_rate = result.first_projection().xp_growth_rate();
    let last_rate = result.final_projection().xp_growth_rate();
    let mut out = Vec::new();
    if last_rate < policy.steep_decline_rate {
        out.push(Recommendation::new(
            RecommendationType::ImproveConsistency,
            "Rebuild a daily routine so XP growth stops shrinking.",
            format!("XP growth is declining ({last_rate:.1}% in the final year)."),
            "Stabilising consistency reverses the decline in yearly XP.",
            "",
            Impact::High,
            policy.declining_growth_priority,
        )?);
    }
    if first_rate < policy.low_growth_rate && last_rate < policy.low_growth_rate {
        out.push(Recommendation::new(
            RecommendationType::ImproveConsistency,
            "Commit to a minimum number of active days each week.",
            format!(
                "XP growth stays low from the first year ({first_rate:.1}%) to the last ({last_rate:.1}%), pointing to low baseline consistency."
            ),
            "A reliable baseline of active days compounds into much higher long-term XP.",
            "",
            Impact::Medium,
            policy.low_baseline_priority,
        )?);
    }
    Ok(out)
}

fn consistency_limit_rule(
    result: &SimulationResult,
    policy: &RecommendationPolicy,
) -> Result<Vec<Recommendation>> {
    let average = result.average_skill_growth();
    if result.burnout_risk() != BurnoutRisk::Low || average >= policy.consistency_limit_skill {
        return Ok(Vec::new());
    }
    Ok(vec![Recommendation::new(
        RecommendationType::ImproveConsistency,
        "Show up more regularly; you have room to do more without burning out.",
        format!("Burnout risk is low but skill growth ({average:.1}) is held back by consistency."),
        "Higher consistency converts spare capacity into skill growth.",
        "",
        Impact::Medium,
        policy.consistency_limit_priority,
    )?])
}

fn goal_engagement_rule(
    result: &SimulationResult,
    policy: &RecommendationPolicy,
) -> Result<Vec<Recommendation>> {
    let first = result.first_projection().skill_growth_index();
    let average = result.average_skill_growth();
    if first >= policy.goal_engagement_skill || average >= policy.goal_engagement_skill {
        return Ok(Vec::new());
    }

    let mut out = vec![Recommendation::new(
        RecommendationType::AddGoalFocus,
        "Tie more of your habits to an active goal.",
        format!("Skill growth starts at {first:.1} and averages {average:.1}, a sign of insufficient goal engagement."),
        "Engaging with goals raises skill growth from the first year onward.",
        "",
        Impact::Medium,
        policy.goal_engagement_priority,
    )?];

    if let [year_one, year_two, ..] = result.yearly_projections() {
        let drop = year_one.skill_growth_index() - year_two.skill_growth_index();
        if drop > policy.goal_refresh_drop {
            out.push(Recommendation::new(
                RecommendationType::AddGoalFocus,
                "Replace stale goals with fresh, specific targets.",
                format!("Skill growth drops by {drop:.1} points between the first and second year."),
                "Fresh goals renew engagement before the decline sets in.",
                "",
                Impact::Low,
                policy.goal_refresh_priority,
            )?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::result_with;
    use proptest::prelude::{prop_assert, proptest};

    fn kinds(recommendations: &[Recommendation]) -> Vec<RecommendationType> {
        recommendations.iter().map(Recommendation::kind).collect()
    }

    #[test]
    fn high_burnout_always_recommends_reducing_it() {
        let result = result_with(&[70.0, 72.0], &[30.0, 25.0], BurnoutRisk::High);
        let recs = recommend(&result).expect("recommendations");
        assert_eq!(recs[0].kind(), RecommendationType::ReduceBurnoutRisk);
        assert!(kinds(&recs).contains(&RecommendationType::AdjustHabitDifficulty));
    }

    #[test]
    fn high_burnout_with_modest_first_year_skips_difficulty_adjustment() {
        let result = result_with(&[55.0, 72.0], &[30.0, 25.0], BurnoutRisk::High);
        let recs = recommend(&result).expect("recommendations");
        assert!(kinds(&recs).contains(&RecommendationType::ReduceBurnoutRisk));
        assert!(!kinds(&recs).contains(&RecommendationType::AdjustHabitDifficulty));
    }

    #[test]
    fn medium_burnout_recommends_balanced_effort() {
        let result = result_with(&[70.0, 72.0], &[30.0, 25.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        assert_eq!(kinds(&recs), vec![RecommendationType::BalanceEffort]);
    }

    #[test]
    fn low_skill_growth_recommends_goal_focus_and_habits() {
        let result = result_with(&[18.0, 15.0], &[30.0, 25.0], BurnoutRisk::Low);
        let recs = recommend(&result).expect("recommendations");
        let kinds = kinds(&recs);
        assert_eq!(kinds[0], RecommendationType::AddGoalFocus);
        assert!(kinds.contains(&RecommendationType::AddHabitsForGrowth));
        assert!(kinds.contains(&RecommendationType::ImproveConsistency));
    }

    #[test]
    fn moderate_skill_growth_recommends_strategy_review() {
        let result = result_with(&[45.0, 44.0], &[30.0, 25.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        assert!(kinds(&recs).contains(&RecommendationType::OptimizeStrategy));
        assert!(!kinds(&recs).contains(&RecommendationType::AddGoalFocus));
    }

    #[test]
    fn plateau_is_flagged_when_skill_falls_across_years() {
        let result = result_with(&[80.0, 75.0, 65.0], &[30.0, 25.0, 20.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        let plateau = recs
            .iter()
            .find(|r| r.kind() == RecommendationType::AddGoalFocus)
            .expect("plateau recommendation");
        assert_eq!(plateau.priority_score(), 80.0);
        assert!(plateau.reason().contains("plateau"));
    }

    #[test]
    fn declining_and_flat_growth_recommend_consistency() {
        let result = result_with(&[70.0, 70.0], &[2.0, -12.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        let consistency: Vec<_> = recs
            .iter()
            .filter(|r| r.kind() == RecommendationType::ImproveConsistency)
            .map(Recommendation::priority_score)
            .collect();
        assert_eq!(consistency, vec![85.0, 75.0]);
    }

    #[test]
    fn weak_goal_engagement_adds_refresh_when_skill_drops_early() {
        let result = result_with(&[38.0, 31.0], &[30.0, 25.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        let goal_priorities: Vec<_> = recs
            .iter()
            .filter(|r| r.kind() == RecommendationType::AddGoalFocus)
            .map(Recommendation::priority_score)
            .collect();
        assert_eq!(goal_priorities, vec![70.0, 60.0]);
    }

    #[test]
    fn equal_priorities_keep_rule_order() {
        let result = result_with(&[25.0, 24.0], &[30.0, -20.0], BurnoutRisk::Medium);
        let recs = recommend(&result).expect("recommendations");
        let top: Vec<_> = recs.iter().take(2).map(Recommendation::kind).collect();
        assert_eq!(
            top,
            vec![RecommendationType::AddGoalFocus, RecommendationType::ImproveConsistency]
        );
    }

    #[test]
    fn healthy_trajectory_produces_no_recommendations() {
        let result = result_with(&[70.0, 72.0], &[30.0, 25.0], BurnoutRisk::Low);
        assert!(recommend(&result).expect("recommendations").is_empty());
    }

    #[test]
    fn thresholds_are_overridable() {
        let result = result_with(&[70.0, 72.0], &[30.0, 25.0], BurnoutRisk::Low);
        let policy = RecommendationPolicy {
            consistency_limit_skill: 75.0,
            ..RecommendationPolicy::default()
        };
        let recs = recommend_with(&result, &policy).expect("recommendations");
        assert_eq!(kinds(&recs), vec![RecommendationType::ImproveConsistency]);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_recommendations_are_sorted_and_complete(
            skills in proptest::collection::vec(0u32..=100, 1..=5),
            rates in proptest::collection::vec(-50i32..200, 5),
            risk in 0u8..3
        ) {
            let skills: Vec<f64> = skills.into_iter().map(f64::from).collect();
            let rates: Vec<f64> = rates.into_iter().take(skills.len()).map(f64::from).collect();
            let risk = match risk {
                0 => BurnoutRisk::Low,
                1 => BurnoutRisk::Medium,
                _ => BurnoutRisk::High,
            };
            let result = result_with(&skills, &rates, risk);
            let recs = recommend(&result).expect("recommendations");

            for pair in recs.windows(2) {
                prop_assert!(pair[0].priority_score() >= pair[1].priority_score());
            }
            for rec in &recs {
                prop_assert!((0.0..=100.0).contains(&rec.priority_score()));
                prop_assert!(!rec.description().trim().is_empty());
                prop_assert!(!rec.reason().trim().is_empty());
                prop_assert!(!rec.expected_benefit().trim().is_empty());
            }
            if risk == BurnoutRisk::High {
                prop_assert!(recs.iter().any(|r| r.kind() == RecommendationType::ReduceBurnoutRisk));
            }
            if result.average_skill_growth() < 30.0 {
                prop_assert!(recs.iter().any(|r| r.kind() == RecommendationType::AddGoalFocus));
            }
        }
    }
}
