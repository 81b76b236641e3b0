use tracing::{debug, warn};

use super::config::EffectivenessPolicy;
use super::types::{
    DeviationReport, EffectivenessEvaluation, LearningSignal, OutcomeMetric,
    RecommendationOutcome, ScenarioImpactSummary, Severity, SimulationResult,
};

const NO_CHANGE_EPSILON: f64 = 1e-9;

// XP and skill are better higher, the burnout tier is better lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

impl Polarity {
    fn sign(self) -> f64 {
        match self {
            Polarity::HigherIsBetter => 1.0,
            Polarity::LowerIsBetter => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MetricComparison {
    metric: OutcomeMetric,
    polarity: Polarity,
    baseline: f64,
    improved: f64,
    actual: f64,
    scale: f64,
    weight: f64,
}

impl MetricComparison {
    // Normalised move from baseline to improved, positive when the projection
    // promised a better value.
    fn projected_gain(&self) -> f64 {
        (self.improved - self.baseline) * self.polarity.sign() / self.scale
    }

    fn projected_to_improve(&self) -> bool {
        self.projected_gain() > NO_CHANGE_EPSILON
    }

    // Share of the projected improvement that happened; negative when the
    // metric moved the wrong way. None unless an improvement was projected.
    fn raw_realization(&self) -> Option<f64> {
        if !self.projected_to_improve() {
            return None;
        }
        Some((self.actual - self.baseline) / (self.improved - self.baseline))
    }

    fn credit(&self) -> f64 {
        if self.shortfall() <= NO_CHANGE_EPSILON {
            return 1.0;
        }
        match self.raw_realization() {
            Some(fraction) => fraction.clamp(0.0, 1.0),
            None => 1.0 - self.shortfall().min(1.0),
        }
    }

    // How far the actual value fell short of the improved projection.
    fn shortfall(&self) -> f64 {
        ((self.improved - self.actual) * self.polarity.sign() / self.scale).max(0.0)
    }

    // How far the actual value beat the improved projection.
    fn overshoot(&self) -> f64 {
        ((self.actual - self.improved) * self.polarity.sign() / self.scale).max(0.0)
    }
}

pub fn evaluate_effectiveness(
    expected: &ScenarioImpactSummary,
    actual: &SimulationResult,
) -> EffectivenessEvaluation {
    evaluate_effectiveness_with(expected, actual, &EffectivenessPolicy::default())
}

pub fn evaluate_effectiveness_with(
    expected: &ScenarioImpactSummary,
    actual: &SimulationResult,
    policy: &EffectivenessPolicy,
) -> EffectivenessEvaluation {
    let comparisons = compare(expected, actual, policy);

    let total_weight: f64 = comparisons.iter().map(|c| c.weight).sum();
    let weighted_credit: f64 = comparisons.iter().map(|c| c.weight * c.credit()).sum();
    let effectiveness_score = if total_weight > 0.0 {
        (100.0 * weighted_credit / total_weight).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let most_affected = comparisons.iter().fold(&comparisons[0], |worst, c| {
        let worse_shortfall = c.shortfall() > worst.shortfall();
        let tied_and_further_off = c.shortfall() == worst.shortfall() && c.overshoot() > worst.overshoot();
        if worse_shortfall || tied_and_further_off { c } else { worst }
    });
    let max_gap = most_affected.shortfall();
    let severity = Severity::from_magnitude(
        max_gap,
        policy.low_deviation,
        policy.medium_deviation,
        policy.high_deviation,
    );

    let poor_match = effectiveness_score < policy.poor_match_score || severity != Severity::None;
    let learning_signals = learning_signals(&comparisons, poor_match, policy);
    let confidence = (100.0 * (1.0 - max_gap.min(1.0))).clamp(0.0, 100.0);

    let recommendation = expected.scenario().recommendations()[0].clone();
    let analysis = deviation_analysis(&comparisons, most_affected.metric, severity);
    let explanation = format!(
        "'{}' realised {effectiveness_score:.0}% of its projected effect in scenario '{}'. Largest shortfall is in {} ({:.1}% of scale, {severity} severity). {}",
        recommendation.description(),
        expected.scenario().name(),
        most_affected.metric.as_str(),
        max_gap * 100.0,
        signal_summary(&learning_signals),
    );

    if poor_match {
        warn!(
            scenario = expected.scenario().name(),
            effectiveness_score,
            %severity,
            signals = ?learning_signals,
            "recommendation underperformed its projection"
        );
    } else {
        debug!(scenario = expected.scenario().name(), effectiveness_score, "recommendation on track");
    }

    EffectivenessEvaluation {
        outcome: RecommendationOutcome {
            recommendation,
            expected: expected.clone(),
            actual: actual.clone(),
            effectiveness_score,
        },
        deviation: DeviationReport {
            severity,
            most_affected_metric: most_affected.metric,
            analysis,
        },
        learning_signals,
        explanation,
        confidence,
    }
}

fn compare(
    expected: &ScenarioImpactSummary,
    actual: &SimulationResult,
    policy: &EffectivenessPolicy,
) -> [MetricComparison; 3] {
    let baseline = expected.baseline_result();
    let improved = expected.improved_result();
    let improved_xp = improved.final_projection().projected_xp() as f64;
    [
        MetricComparison {
            metric: OutcomeMetric::FinalXp,
            polarity: Polarity::HigherIsBetter,
            baseline: baseline.final_projection().projected_xp() as f64,
            improved: improved_xp,
            actual: actual.final_projection().projected_xp() as f64,
            scale: improved_xp.max(1.0),
            weight: policy.xp_weight,
        },
        MetricComparison {
            metric: OutcomeMetric::SkillGrowth,
            polarity: Polarity::HigherIsBetter,
            baseline: baseline.average_skill_growth(),
            improved: improved.average_skill_growth(),
            actual: actual.average_skill_growth(),
            scale: 100.0,
            weight: policy.skill_weight,
        },
        MetricComparison {
            metric: OutcomeMetric::BurnoutRisk,
            polarity: Polarity::LowerIsBetter,
            baseline: baseline.burnout_risk().ordinal() as f64,
            improved: improved.burnout_risk().ordinal() as f64,
            actual: actual.burnout_risk().ordinal() as f64,
            scale: 2.0,
            weight: policy.burnout_weight,
        },
    ]
}

fn learning_signals(
    comparisons: &[MetricComparison; 3],
    poor_match: bool,
    policy: &EffectivenessPolicy,
) -> Vec<LearningSignal> {
    let mut signals = Vec::new();

    for comparison in comparisons {
        if comparison.overshoot() > policy.overshoot_margin {
            push_signal(&mut signals, LearningSignal::UnderestimatedImpact);
        }
        if comparison.shortfall() <= NO_CHANGE_EPSILON {
            continue;
        }
        match comparison.raw_realization() {
            Some(fraction) if fraction < 0.0 && comparison.shortfall() > policy.overshoot_margin => {
                push_signal(&mut signals, LearningSignal::IncorrectModelAssumption);
            }
            Some(fraction) if fraction < policy.compliance_fraction => {
                push_signal(&mut signals, LearningSignal::LowUserCompliance);
            }
            Some(_) => push_signal(&mut signals, LearningSignal::OverOptimisticRecommendation),
            // Accepted trade-off that ended up worse than projected.
            None if comparison.shortfall() > policy.overshoot_margin => {
                push_signal(&mut signals, LearningSignal::IncorrectModelAssumption);
            }
            None => {}
        }
    }

    let burnout = &comparisons[2];
    if burnout.actual > burnout.baseline.max(burnout.improved) {
        push_signal(&mut signals, LearningSignal::BurnoutUnderestimated);
    }

    if poor_match && signals.is_empty() {
        push_signal(&mut signals, LearningSignal::IncorrectModelAssumption);
    }
    signals
}

fn push_signal(signals: &mut Vec<LearningSignal>, signal: LearningSignal) {
    if !signals.contains(&signal) {
        signals.push(signal);
    }
}

fn deviation_analysis(
    comparisons: &[MetricComparison; 3],
    most_affected: OutcomeMetric,
    severity: Severity,
) -> String {
    let lines: Vec<String> = comparisons
        .iter()
        .map(|c| {
            format!(
                "{}: baseline {:.1}, projected {:.1}, actual {:.1} (shortfall {:.1}%, overshoot {:.1}%)",
                c.metric.as_str(),
                c.baseline,
                c.improved,
                c.actual,
                c.shortfall() * 100.0,
                c.overshoot() * 100.0
            )
        })
        .collect();
    format!(
        "Deviation severity {severity}; most affected metric: {}.\n{}",
        most_affected.as_str(),
        lines.join("\n")
    )
}

fn signal_summary(signals: &[LearningSignal]) -> String {
    if signals.is_empty() {
        return "No model adjustments suggested.".to_string();
    }
    let labels: Vec<&str> = signals
        .iter()
        .map(|s| match s {
            LearningSignal::OverOptimisticRecommendation => "projection was over-optimistic",
            LearningSignal::LowUserCompliance => "the advice was likely not followed",
            LearningSignal::IncorrectModelAssumption => "a model assumption looks wrong",
            LearningSignal::UnderestimatedImpact => "the impact was underestimated",
            LearningSignal::BurnoutUnderestimated => "burnout risk was underestimated",
        })
        .collect();
    format!("Possible causes: {}.", labels.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::simulate;
    use crate::core::fixtures::{
        assert_approx, burnout_prone_input, outcome_result, recommendation, result_with,
        sample_input,
    };
    use crate::core::scenario::{evaluate_scenarios, generate_scenarios};
    use crate::core::types::{BurnoutRisk, BurnoutRiskChange, RecommendationType};
    use proptest::prelude::{prop_assert, proptest};

    fn consistency_summary() -> ScenarioImpactSummary {
        let input = sample_input();
        let base = simulate(&input).expect("baseline");
        let recs = vec![recommendation(RecommendationType::ImproveConsistency, 75.0)];
        let scenarios = generate_scenarios(&input, &recs).expect("scenarios");
        evaluate_scenarios(&input, &base, &scenarios)
            .expect("summaries")
            .remove(0)
    }

    fn burnout_summary() -> ScenarioImpactSummary {
        let input = burnout_prone_input();
        let base = simulate(&input).expect("baseline");
        let recs = vec![recommendation(RecommendationType::ReduceBurnoutRisk, 90.0)];
        let scenarios = generate_scenarios(&input, &recs).expect("scenarios");
        evaluate_scenarios(&input, &base, &scenarios)
            .expect("summaries")
            .remove(0)
    }

    fn final_xp(result: &SimulationResult) -> u64 {
        result.final_projection().projected_xp()
    }

    #[test]
    fn matching_the_improved_projection_scores_full_marks() {
        let summary = consistency_summary();
        let actual = summary.improved_result().clone();
        let evaluation = evaluate_effectiveness(&summary, &actual);

        assert_approx(evaluation.outcome().effectiveness_score(), 100.0);
        assert_eq!(evaluation.deviation().severity(), Severity::None);
        assert!(evaluation.learning_signals().is_empty());
        assert_approx(evaluation.confidence(), 100.0);
        assert!(!evaluation.deviation().analysis().trim().is_empty());
        assert_eq!(
            evaluation.outcome().recommendation().kind(),
            RecommendationType::ImproveConsistency
        );
    }

    #[test]
    fn matching_the_baseline_scores_low_and_flags_compliance() {
        let summary = consistency_summary();
        let actual = summary.baseline_result().clone();
        let evaluation = evaluate_effectiveness(&summary, &actual);

        assert!(evaluation.outcome().effectiveness_score() < 30.0);
        assert!(evaluation.deviation().severity() > Severity::None);
        assert!(evaluation.learning_signals().contains(&LearningSignal::LowUserCompliance));
        assert!(evaluation.confidence() < 100.0);
    }

    #[test]
    fn partial_realisation_is_over_optimistic() {
        let summary = consistency_summary();
        let base = summary.baseline_result();
        let improved = summary.improved_result();
        let halfway_xp = (final_xp(base) + final_xp(improved)) / 2;
        let halfway_skill =
            (base.average_skill_growth() + improved.average_skill_growth()) / 2.0;
        let actual = outcome_result(halfway_xp, halfway_skill, improved.burnout_risk());

        let evaluation = evaluate_effectiveness(&summary, &actual);
        let score = evaluation.outcome().effectiveness_score();
        assert!(score > 50.0 && score < 70.0, "score {score}");
        assert!(
            evaluation
                .learning_signals()
                .contains(&LearningSignal::OverOptimisticRecommendation)
        );
    }

    #[test]
    fn overshoot_is_capped_and_reported() {
        let summary = consistency_summary();
        let base = summary.baseline_result();
        let improved = summary.improved_result();
        let overshoot_xp = final_xp(improved) + 3 * (final_xp(improved) - final_xp(base));
        let actual = outcome_result(
            overshoot_xp,
            improved.average_skill_growth(),
            improved.burnout_risk(),
        );

        let evaluation = evaluate_effectiveness(&summary, &actual);
        assert!(evaluation.outcome().effectiveness_score() <= 100.0);
        assert!(evaluation.outcome().effectiveness_score() > 99.0);
        assert_eq!(evaluation.deviation().most_affected_metric(), OutcomeMetric::FinalXp);
        assert!(evaluation.learning_signals().contains(&LearningSignal::UnderestimatedImpact));
    }

    #[test]
    fn beating_every_projection_of_a_burnout_plan_earns_full_credit() {
        let summary = burnout_summary();
        assert_eq!(summary.scenario().name(), "Burnout Risk Reduction");
        assert_eq!(summary.burnout_risk_change(), BurnoutRiskChange::Improved);

        let base = summary.baseline_result();
        let improved = summary.improved_result();
        let actual = outcome_result(
            final_xp(base).max(final_xp(improved)) + 1_000,
            improved.average_skill_growth(),
            improved.burnout_risk(),
        );

        let evaluation = evaluate_effectiveness(&summary, &actual);
        assert_approx(evaluation.outcome().effectiveness_score(), 100.0);
        assert_eq!(evaluation.deviation().severity(), Severity::None);
        assert_approx(evaluation.confidence(), 100.0);
        let signals = evaluation.learning_signals();
        assert!(!signals.contains(&LearningSignal::LowUserCompliance), "{signals:?}");
        assert!(!signals.contains(&LearningSignal::OverOptimisticRecommendation), "{signals:?}");
        assert!(!signals.contains(&LearningSignal::IncorrectModelAssumption), "{signals:?}");
    }

    #[test]
    fn lower_burnout_tier_than_projected_counts_as_success() {
        let input = sample_input();
        let recs = vec![recommendation(RecommendationType::ReduceBurnoutRisk, 80.0)];
        let scenario = generate_scenarios(&input, &recs).expect("scenarios").remove(0);
        let baseline = result_with(&[40.0, 45.0, 50.0], &[10.0, 10.0, 10.0], BurnoutRisk::High);
        let improved = result_with(&[50.0, 55.0, 60.0], &[10.0, 10.0, 10.0], BurnoutRisk::Medium);
        let summary = ScenarioImpactSummary::new(scenario, baseline, improved).expect("summary");
        let actual = outcome_result(3_000, 55.0, BurnoutRisk::Low);

        let evaluation = evaluate_effectiveness(&summary, &actual);
        assert_approx(evaluation.outcome().effectiveness_score(), 100.0);
        assert_eq!(evaluation.deviation().severity(), Severity::None);
        assert_eq!(evaluation.deviation().most_affected_metric(), OutcomeMetric::BurnoutRisk);
        assert_eq!(evaluation.learning_signals(), &[LearningSignal::UnderestimatedImpact]);
    }

    #[test]
    fn losing_far_more_xp_than_the_plan_allowed_is_flagged() {
        let summary = burnout_summary();
        let improved = summary.improved_result();
        let actual = outcome_result(
            final_xp(improved) / 2,
            improved.average_skill_growth(),
            improved.burnout_risk(),
        );

        let evaluation = evaluate_effectiveness(&summary, &actual);
        assert!(evaluation.outcome().effectiveness_score() < 100.0);
        assert_eq!(evaluation.deviation().most_affected_metric(), OutcomeMetric::FinalXp);
        assert_eq!(evaluation.deviation().severity(), Severity::High);
        assert!(
            evaluation
                .learning_signals()
                .contains(&LearningSignal::IncorrectModelAssumption)
        );
    }

    #[test]
    fn burnout_worse_than_both_projections_is_flagged() {
        let summary = consistency_summary();
        let improved = summary.improved_result();
        let actual = outcome_result(
            final_xp(improved),
            improved.average_skill_growth(),
            BurnoutRisk::High,
        );

        let evaluation = evaluate_effectiveness(&summary, &actual);
        assert_eq!(evaluation.deviation().most_affected_metric(), OutcomeMetric::BurnoutRisk);
        assert_eq!(evaluation.deviation().severity(), Severity::High);
        assert!(evaluation.learning_signals().contains(&LearningSignal::BurnoutUnderestimated));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_scores_and_confidence_stay_bounded(
            xp in 0u64..500_000,
            skill in 0u32..=100,
            risk in 0u8..3
        ) {
            let summary = consistency_summary();
            let risk = match risk {
                0 => BurnoutRisk::Low,
                1 => BurnoutRisk::Medium,
                _ => BurnoutRisk::High,
            };
            let actual = outcome_result(xp, skill as f64, risk);
            let evaluation = evaluate_effectiveness(&summary, &actual);
            let score = evaluation.outcome().effectiveness_score();

            prop_assert!((0.0..=100.0).contains(&score));
            prop_assert!((0.0..=100.0).contains(&evaluation.confidence()));
            prop_assert!(!evaluation.explanation().trim().is_empty());
            if score < 70.0 || evaluation.deviation().severity() != Severity::None {
                prop_assert!(!evaluation.learning_signals().is_empty());
            }
        }
    }
}
