use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{
    Result, TrajectoryError, check_non_negative, check_not_blank, check_range,
};

pub const MIN_YEARS: u32 = 1;
pub const MAX_YEARS: u32 = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    One,
    Two,
    Three,
    Four,
    Five,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::One,
        Difficulty::Two,
        Difficulty::Three,
        Difficulty::Four,
        Difficulty::Five,
    ];

    pub fn tier(self) -> u32 {
        match self {
            Difficulty::One => 1,
            Difficulty::Two => 2,
            Difficulty::Three => 3,
            Difficulty::Four => 4,
            Difficulty::Five => 5,
        }
    }

    pub fn easier(self) -> Self {
        match self {
            Difficulty::One | Difficulty::Two => Difficulty::One,
            Difficulty::Three => Difficulty::Two,
            Difficulty::Four => Difficulty::Three,
            Difficulty::Five => Difficulty::Four,
        }
    }

    pub fn is_hard(self) -> bool {
        self.tier() >= 4
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGoal {
    pub title: String,
    #[serde(default)]
    pub xp_reward: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BurnoutWarning {
    pub active: bool,
    pub reasons: Vec<String>,
    pub severity: f64,
}

impl BurnoutWarning {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn active(severity: f64, reasons: Vec<String>) -> Self {
        Self {
            active: true,
            reasons,
            severity,
        }
    }

    fn effective_severity(&self) -> f64 {
        if self.active { self.severity } else { 0.0 }
    }
}

// Unvalidated field bag for `SimulationInput`. Any value of this type can
// be turned into an input with `SimulationInput::try_from`, which rejects
// out-of-range fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInputDraft {
    pub total_xp: u64,
    pub level: u32,
    pub habits_consistency_score: f64,
    pub average_daily_effort: f64,
    #[serde(default)]
    pub habits_by_difficulty: BTreeMap<Difficulty, u32>,
    #[serde(default)]
    pub active_goals: Vec<ActiveGoal>,
    #[serde(default)]
    pub burnout_warning: BurnoutWarning,
    pub active_days_last_month: u32,
    #[serde(default)]
    pub average_streak_length: f64,
    pub years_to_simulate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SimulationInputDraft", into = "SimulationInputDraft")]
pub struct SimulationInput {
    total_xp: u64,
    level: u32,
    habits_consistency_score: f64,
    average_daily_effort: f64,
    habits_by_difficulty: BTreeMap<Difficulty, u32>,
    active_goals: Vec<ActiveGoal>,
    burnout_warning: BurnoutWarning,
    active_days_last_month: u32,
    average_streak_length: f64,
    years_to_simulate: u32,
}

impl TryFrom<SimulationInputDraft> for SimulationInput {
    type Error = TrajectoryError;

    fn try_from(draft: SimulationInputDraft) -> Result<Self> {
        if draft.level < 1 {
            return Err(TrajectoryError::invalid("level", "must be >= 1"));
        }
        check_range(
            "habitsConsistencyScore",
            draft.habits_consistency_score,
            0.0,
            100.0,
        )?;
        check_non_negative("averageDailyEffort", draft.average_daily_effort)?;
        if draft.active_days_last_month > 31 {
            return Err(TrajectoryError::invalid(
                "activeDaysLastMonth",
                format!("must be between 0 and 31, got {}", draft.active_days_last_month),
            ));
        }
        check_non_negative("averageStreakLength", draft.average_streak_length)?;
        if !(MIN_YEARS..=MAX_YEARS).contains(&draft.years_to_simulate) {
            return Err(TrajectoryError::invalid(
                "yearsToSimulate",
                format!(
                    "must be between {MIN_YEARS} and {MAX_YEARS}, got {}",
                    draft.years_to_simulate
                ),
            ));
        }
        check_range(
            "burnoutWarning.severity",
            draft.burnout_warning.severity,
            0.0,
            100.0,
        )?;
        for goal in &draft.active_goals {
            check_not_blank("activeGoals.title", &goal.title)?;
        }

        Ok(Self {
            total_xp: draft.total_xp,
            level: draft.level,
            habits_consistency_score: draft.habits_consistency_score,
            average_daily_effort: draft.average_daily_effort,
            habits_by_difficulty: draft
                .habits_by_difficulty
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .collect(),
            active_goals: draft.active_goals,
            burnout_warning: draft.burnout_warning,
            active_days_last_month: draft.active_days_last_month,
            average_streak_length: draft.average_streak_length,
            years_to_simulate: draft.years_to_simulate,
        })
    }
}

impl From<SimulationInput> for SimulationInputDraft {
    fn from(input: SimulationInput) -> Self {
        Self {
            total_xp: input.total_xp,
            level: input.level,
            habits_consistency_score: input.habits_consistency_score,
            average_daily_effort: input.average_daily_effort,
            habits_by_difficulty: input.habits_by_difficulty,
            active_goals: input.active_goals,
            burnout_warning: input.burnout_warning,
            active_days_last_month: input.active_days_last_month,
            average_streak_length: input.average_streak_length,
            years_to_simulate: input.years_to_simulate,
        }
    }
}

impl SimulationInput {
    pub fn to_draft(&self) -> SimulationInputDraft {
        self.clone().into()
    }

    pub fn total_xp(&self) -> u64 {
        self.total_xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn habits_consistency_score(&self) -> f64 {
        self.habits_consistency_score
    }

    pub fn average_daily_effort(&self) -> f64 {
        self.average_daily_effort
    }

    pub fn habits_by_difficulty(&self) -> &BTreeMap<Difficulty, u32> {
        &self.habits_by_difficulty
    }

    pub fn active_goals(&self) -> &[ActiveGoal] {
        &self.active_goals
    }

    pub fn burnout_warning(&self) -> &BurnoutWarning {
        &self.burnout_warning
    }

    pub fn active_days_last_month(&self) -> u32 {
        self.active_days_last_month
    }

    pub fn average_streak_length(&self) -> f64 {
        self.average_streak_length
    }

    pub fn years_to_simulate(&self) -> u32 {
        self.years_to_simulate
    }

    pub fn habit_count(&self) -> u32 {
        self.habits_by_difficulty.values().sum()
    }

    pub fn hard_habit_count(&self) -> u32 {
        self.habits_by_difficulty
            .iter()
            .filter(|(difficulty, _)| difficulty.is_hard())
            .map(|(_, count)| *count)
            .sum()
    }

    // Count-weighted mean tier, or `None` without habits.
    pub fn mean_difficulty(&self) -> Option<f64> {
        let count = self.habit_count();
        if count == 0 {
            return None;
        }
        let weighted: u32 = self
            .habits_by_difficulty
            .iter()
            .map(|(difficulty, count)| difficulty.tier() * count)
            .sum();
        Some(weighted as f64 / count as f64)
    }

    pub fn goal_xp_total(&self) -> u64 {
        self.active_goals.iter().map(|g| g.xp_reward).sum()
    }

    pub(crate) fn warning_severity(&self) -> f64 {
        self.burnout_warning.effective_severity()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyProjectionDraft {
    pub year: u32,
    pub projected_xp: u64,
    pub projected_level: u32,
    pub skill_growth_index: f64,
    pub xp_growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "YearlyProjectionDraft")]
pub struct YearlyProjection {
    year: u32,
    projected_xp: u64,
    projected_level: u32,
    skill_growth_index: f64,
    xp_growth_rate: f64,
}

impl TryFrom<YearlyProjectionDraft> for YearlyProjection {
    type Error = TrajectoryError;

    fn try_from(draft: YearlyProjectionDraft) -> Result<Self> {
        Self::new(
            draft.year,
            draft.projected_xp,
            draft.projected_level,
            draft.skill_growth_index,
            draft.xp_growth_rate,
        )
    }
}

impl YearlyProjection {
    pub fn new(
        year: u32,
        projected_xp: u64,
        projected_level: u32,
        skill_growth_index: f64,
        xp_growth_rate: f64,
    ) -> Result<Self> {
        if year < 1 {
            return Err(TrajectoryError::invalid("year", "must be >= 1"));
        }
        if projected_level < 1 {
            return Err(TrajectoryError::invalid("projectedLevel", "must be >= 1"));
        }
        check_range("skillGrowthIndex", skill_growth_index, 0.0, 100.0)?;
        if !xp_growth_rate.is_finite() {
            return Err(TrajectoryError::invalid("xpGrowthRate", "must be finite"));
        }
        Ok(Self {
            year,
            projected_xp,
            projected_level,
            skill_growth_index,
            xp_growth_rate,
        })
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn projected_xp(&self) -> u64 {
        self.projected_xp
    }

    pub fn projected_level(&self) -> u32 {
        self.projected_level
    }

    pub fn skill_growth_index(&self) -> f64 {
        self.skill_growth_index
    }

    pub fn xp_growth_rate(&self) -> f64 {
        self.xp_growth_rate
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BurnoutRisk {
    Low,
    Medium,
    High,
}

impl BurnoutRisk {
    pub fn ordinal(self) -> u8 {
        match self {
            BurnoutRisk::Low => 0,
            BurnoutRisk::Medium => 1,
            BurnoutRisk::High => 2,
        }
    }

    pub fn escalate(self) -> Self {
        match self {
            BurnoutRisk::Low => BurnoutRisk::Medium,
            BurnoutRisk::Medium | BurnoutRisk::High => BurnoutRisk::High,
        }
    }
}

impl fmt::Display for BurnoutRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BurnoutRisk::Low => "low",
            BurnoutRisk::Medium => "medium",
            BurnoutRisk::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomeRangeDraft {
    pub low: f64,
    pub expected: f64,
    pub high: f64,
}

// 25th/50th/75th percentile annual income estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IncomeRangeDraft")]
pub struct IncomeRange {
    low: f64,
    expected: f64,
    high: f64,
}

impl TryFrom<IncomeRangeDraft> for IncomeRange {
    type Error = TrajectoryError;

    fn try_from(draft: IncomeRangeDraft) -> Result<Self> {
        Self::new(draft.low, draft.expected, draft.high)
    }
}

impl IncomeRange {
    pub fn new(low: f64, expected: f64, high: f64) -> Result<Self> {
        check_non_negative("income.low", low)?;
        check_non_negative("income.expected", expected)?;
        check_non_negative("income.high", high)?;
        if low > expected || expected > high {
            return Err(TrajectoryError::invalid(
                "income",
                format!("percentiles out of order: {low} / {expected} / {high}"),
            ));
        }
        Ok(Self {
            low,
            expected,
            high,
        })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn expected(&self) -> f64 {
        self.expected
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

// Borrowed view of a trajectory before (or after) it is wrapped into a
// `SimulationResult`; the explanation is written from this.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryView<'a> {
    pub projections: &'a [YearlyProjection],
    pub average_skill_growth: f64,
    pub burnout_risk: BurnoutRisk,
    pub income_range: &'a IncomeRange,
    pub emigration_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResultDraft {
    pub yearly_projections: Vec<YearlyProjection>,
    pub average_skill_growth: f64,
    pub burnout_risk: BurnoutRisk,
    pub income_range: IncomeRange,
    pub emigration_probability: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SimulationResultDraft")]
pub struct SimulationResult {
    yearly_projections: Vec<YearlyProjection>,
    average_skill_growth: f64,
    burnout_risk: BurnoutRisk,
    income_range: IncomeRange,
    emigration_probability: f64,
    explanation: String,
}

impl TryFrom<SimulationResultDraft> for SimulationResult {
    type Error = TrajectoryError;

    fn try_from(draft: SimulationResultDraft) -> Result<Self> {
        Self::new(
            draft.yearly_projections,
            draft.average_skill_growth,
            draft.burnout_risk,
            draft.income_range,
            draft.emigration_probability,
            draft.explanation,
        )
    }
}

impl SimulationResult {
    pub fn new(
        yearly_projections: Vec<YearlyProjection>,
        average_skill_growth: f64,
        burnout_risk: BurnoutRisk,
        income_range: IncomeRange,
        emigration_probability: f64,
        explanation: String,
    ) -> Result<Self> {
        if yearly_projections.is_empty() {
            return Err(TrajectoryError::invalid(
                "yearlyProjections",
                "must contain at least one year",
            ));
        }
        if yearly_projections
            .windows(2)
            .any(|pair| pair[1].year <= pair[0].year)
        {
            return Err(TrajectoryError::invalid(
                "yearlyProjections",
                "years must be strictly ascending",
            ));
        }
        check_range("averageSkillGrowth", average_skill_growth, 0.0, 100.0)?;
        check_range("emigrationProbability", emigration_probability, 0.0, 100.0)?;
        check_not_blank("explanation", &explanation)?;

        Ok(Self {
            yearly_projections,
            average_skill_growth,
            burnout_risk,
            income_range,
            emigration_probability,
            explanation,
        })
    }

    pub fn yearly_projections(&self) -> &[YearlyProjection] {
        &self.yearly_projections
    }

    pub fn first_projection(&self) -> &YearlyProjection {
        &self.yearly_projections[0]
    }

    pub fn final_projection(&self) -> &YearlyProjection {
        &self.yearly_projections[self.yearly_projections.len() - 1]
    }

    pub fn average_skill_growth(&self) -> f64 {
        self.average_skill_growth
    }

    pub fn burnout_risk(&self) -> BurnoutRisk {
        self.burnout_risk
    }

    pub fn income_range(&self) -> &IncomeRange {
        &self.income_range
    }

    pub fn emigration_probability(&self) -> f64 {
        self.emigration_probability
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn view(&self) -> TrajectoryView<'_> {
        TrajectoryView {
            projections: &self.yearly_projections,
            average_skill_growth: self.average_skill_growth,
            burnout_risk: self.burnout_risk,
            income_range: &self.income_range,
            emigration_probability: self.emigration_probability,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationType {
    ReduceBurnoutRisk,
    ImproveConsistency,
    AddGoalFocus,
    AdjustHabitDifficulty,
    AddHabitsForGrowth,
    BalanceEffort,
    OptimizeStrategy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDraft {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub description: String,
    pub reason: String,
    pub expected_benefit: String,
    #[serde(default)]
    pub risk_note: String,
    pub impact: Impact,
    pub priority_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RecommendationDraft")]
pub struct Recommendation {
    #[serde(rename = "type")]
    kind: RecommendationType,
    description: String,
    reason: String,
    expected_benefit: String,
    risk_note: String,
    impact: Impact,
    priority_score: f64,
}

impl TryFrom<RecommendationDraft> for Recommendation {
    type Error = TrajectoryError;

    fn try_from(draft: RecommendationDraft) -> Result<Self> {
        Self::new(
            draft.kind,
            draft.description,
            draft.reason,
            draft.expected_benefit,
            draft.risk_note,
            draft.impact,
            draft.priority_score,
        )
    }
}

impl Recommendation {
    pub fn new(
        kind: RecommendationType,
        description: impl Into<String>,
        reason: impl Into<String>,
        expected_benefit: impl Into<String>,
        risk_note: impl Into<String>,
        impact: Impact,
        priority_score: f64,
    ) -> Result<Self> {
        let description = description.into();
        let reason = reason.into();
        let expected_benefit = expected_benefit.into();
        check_not_blank("description", &description)?;
        check_not_blank("reason", &reason)?;
        check_not_blank("expectedBenefit", &expected_benefit)?;
        check_range("priorityScore", priority_score, 0.0, 100.0)?;
        Ok(Self {
            kind,
            description,
            reason,
            expected_benefit,
            risk_note: risk_note.into(),
            impact,
            priority_score,
        })
    }

    pub fn kind(&self) -> RecommendationType {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn expected_benefit(&self) -> &str {
        &self.expected_benefit
    }

    pub fn risk_note(&self) -> &str {
        &self.risk_note
    }

    pub fn impact(&self) -> Impact {
        self.impact
    }

    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScenarioDraft {
    pub name: String,
    pub recommendations: Vec<Recommendation>,
    pub modified_input: SimulationInput,
    pub rationale: String,
    #[serde(default)]
    pub expected_long_term_benefit: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GeneratedScenarioDraft")]
pub struct GeneratedScenario {
    name: String,
    recommendations: Vec<Recommendation>,
    modified_input: SimulationInput,
    rationale: String,
    expected_long_term_benefit: serde_json::Value,
}

impl TryFrom<GeneratedScenarioDraft> for GeneratedScenario {
    type Error = TrajectoryError;

    fn try_from(draft: GeneratedScenarioDraft) -> Result<Self> {
        Self::new(
            draft.name,
            draft.recommendations,
            draft.modified_input,
            draft.rationale,
            draft.expected_long_term_benefit,
        )
    }
}

impl GeneratedScenario {
    pub fn new(
        name: impl Into<String>,
        recommendations: Vec<Recommendation>,
        modified_input: SimulationInput,
        rationale: impl Into<String>,
        expected_long_term_benefit: serde_json::Value,
    ) -> Result<Self> {
        let name = name.into();
        let rationale = rationale.into();
        check_not_blank("scenario.name", &name)?;
        check_not_blank("scenario.rationale", &rationale)?;
        if recommendations.is_empty() {
            return Err(TrajectoryError::invalid(
                "scenario.recommendations",
                "must embody at least one recommendation",
            ));
        }
        Ok(Self {
            name,
            recommendations,
            modified_input,
            rationale,
            expected_long_term_benefit,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn modified_input(&self) -> &SimulationInput {
        &self.modified_input
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn expected_long_term_benefit(&self) -> &serde_json::Value {
        &self.expected_long_term_benefit
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BurnoutRiskChange {
    Improved,
    Unchanged,
    Worsened,
}

impl BurnoutRiskChange {
    pub fn between(baseline: BurnoutRisk, improved: BurnoutRisk) -> Self {
        match improved.ordinal().cmp(&baseline.ordinal()) {
            std::cmp::Ordering::Less => BurnoutRiskChange::Improved,
            std::cmp::Ordering::Equal => BurnoutRiskChange::Unchanged,
            std::cmp::Ordering::Greater => BurnoutRiskChange::Worsened,
        }
    }
}

// Only the scenario and the two runs are read back; every delta is derived
// again from them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioImpactSummaryDraft {
    pub scenario: GeneratedScenario,
    pub baseline_result: SimulationResult,
    pub improved_result: SimulationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScenarioImpactSummaryDraft")]
pub struct ScenarioImpactSummary {
    scenario: GeneratedScenario,
    baseline_result: SimulationResult,
    improved_result: SimulationResult,
    xp_improvement_percent: f64,
    skill_growth_improvement: f64,
    burnout_risk_change: BurnoutRiskChange,
    projected_xp_delta: f64,
    expected_income_delta: f64,
    impact_description: String,
}

impl TryFrom<ScenarioImpactSummaryDraft> for ScenarioImpactSummary {
    type Error = TrajectoryError;

    fn try_from(draft: ScenarioImpactSummaryDraft) -> Result<Self> {
        Self::new(draft.scenario, draft.baseline_result, draft.improved_result)
    }
}

impl ScenarioImpactSummary {
    pub fn new(
        scenario: GeneratedScenario,
        baseline_result: SimulationResult,
        improved_result: SimulationResult,
    ) -> Result<Self> {
        let years = scenario.modified_input().years_to_simulate() as usize;
        if improved_result.yearly_projections().len() != years {
            return Err(TrajectoryError::invalid(
                "improvedResult",
                format!(
                    "covers {} years but scenario '{}' simulates {years}",
                    improved_result.yearly_projections().len(),
                    scenario.name()
                ),
            ));
        }
        if baseline_result.yearly_projections().len() != years {
            return Err(TrajectoryError::invalid(
                "baselineResult",
                format!(
                    "covers {} years but the improved run covers {years}",
                    baseline_result.yearly_projections().len()
                ),
            ));
        }

        let base_xp = baseline_result.final_projection().projected_xp() as f64;
        let improved_xp = improved_result.final_projection().projected_xp() as f64;
        let xp_improvement_percent = if base_xp > 0.0 {
            (improved_xp - base_xp) / base_xp * 100.0
        } else if improved_xp > 0.0 {
            100.0
        } else {
            0.0
        };
        let skill_growth_improvement =
            improved_result.average_skill_growth() - baseline_result.average_skill_growth();
        let burnout_risk_change = BurnoutRiskChange::between(
            baseline_result.burnout_risk(),
            improved_result.burnout_risk(),
        );
        let projected_xp_delta = improved_xp - base_xp;
        let expected_income_delta =
            improved_result.income_range().expected() - baseline_result.income_range().expected();

        let change_label = match burnout_risk_change {
            BurnoutRiskChange::Improved => "improves",
            BurnoutRiskChange::Unchanged => "stays the same",
            BurnoutRiskChange::Worsened => "worsens",
        };
        let impact_description = format!(
            "{}: final XP {xp_improvement_percent:+.1}% ({projected_xp_delta:+.0} XP), skill growth {skill_growth_improvement:+.1} points, expected income {expected_income_delta:+.0}; burnout risk {change_label} ({} -> {}).",
            scenario.name(),
            baseline_result.burnout_risk(),
            improved_result.burnout_risk(),
        );

        Ok(Self {
            scenario,
            baseline_result,
            improved_result,
            xp_improvement_percent,
            skill_growth_improvement,
            burnout_risk_change,
            projected_xp_delta,
            expected_income_delta,
            impact_description,
        })
    }

    pub fn scenario(&self) -> &GeneratedScenario {
        &self.scenario
    }

    pub fn baseline_result(&self) -> &SimulationResult {
        &self.baseline_result
    }

    pub fn improved_result(&self) -> &SimulationResult {
        &self.improved_result
    }

    pub fn xp_improvement_percent(&self) -> f64 {
        self.xp_improvement_percent
    }

    pub fn skill_growth_improvement(&self) -> f64 {
        self.skill_growth_improvement
    }

    pub fn burnout_risk_change(&self) -> BurnoutRiskChange {
        self.burnout_risk_change
    }

    pub fn projected_xp_delta(&self) -> f64 {
        self.projected_xp_delta
    }

    pub fn expected_income_delta(&self) -> f64 {
        self.expected_income_delta
    }

    pub fn impact_description(&self) -> &str {
        &self.impact_description
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub(crate) fn from_magnitude(magnitude: f64, low: f64, medium: f64, high: f64) -> Self {
        if magnitude >= high {
            Severity::High
        } else if magnitude >= medium {
            Severity::Medium
        } else if magnitude >= low {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeMetric {
    FinalXp,
    SkillGrowth,
    BurnoutRisk,
}

impl OutcomeMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeMetric::FinalXp => "finalXp",
            OutcomeMetric::SkillGrowth => "skillGrowth",
            OutcomeMetric::BurnoutRisk => "burnoutRisk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationOutcome {
    pub(crate) recommendation: Recommendation,
    pub(crate) expected: ScenarioImpactSummary,
    pub(crate) actual: SimulationResult,
    pub(crate) effectiveness_score: f64,
}

impl RecommendationOutcome {
    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    pub fn expected(&self) -> &ScenarioImpactSummary {
        &self.expected
    }

    pub fn actual(&self) -> &SimulationResult {
        &self.actual
    }

    pub fn effectiveness_score(&self) -> f64 {
        self.effectiveness_score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationReport {
    pub(crate) severity: Severity,
    pub(crate) most_affected_metric: OutcomeMetric,
    pub(crate) analysis: String,
}

impl DeviationReport {
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn most_affected_metric(&self) -> OutcomeMetric {
        self.most_affected_metric
    }

    pub fn analysis(&self) -> &str {
        &self.analysis
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningSignal {
    OverOptimisticRecommendation,
    LowUserCompliance,
    IncorrectModelAssumption,
    UnderestimatedImpact,
    BurnoutUnderestimated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessEvaluation {
    pub(crate) outcome: RecommendationOutcome,
    pub(crate) deviation: DeviationReport,
    pub(crate) learning_signals: Vec<LearningSignal>,
    pub(crate) explanation: String,
    pub(crate) confidence: f64,
}

impl EffectivenessEvaluation {
    pub fn outcome(&self) -> &RecommendationOutcome {
        &self.outcome
    }

    pub fn deviation(&self) -> &DeviationReport {
        &self.deviation
    }

    pub fn learning_signals(&self) -> &[LearningSignal] {
        &self.learning_signals
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorSnapshotDraft {
    pub date: NaiveDate,
    pub average_daily_xp: f64,
    pub habit_completion_rate: f64,
    pub streak_stability_index: f64,
    pub burnout_risk_score: f64,
    pub active_goal_count: u32,
    pub goal_engagement_rate: f64,
}

// Behaviour aggregated up to `date`. Rates and the stability index are
// fractions in [0, 1]; the burnout score is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BehaviorSnapshotDraft", into = "BehaviorSnapshotDraft")]
pub struct BehaviorSnapshot {
    date: NaiveDate,
    average_daily_xp: f64,
    habit_completion_rate: f64,
    streak_stability_index: f64,
    burnout_risk_score: f64,
    active_goal_count: u32,
    goal_engagement_rate: f64,
}

impl TryFrom<BehaviorSnapshotDraft> for BehaviorSnapshot {
    type Error = TrajectoryError;

    fn try_from(draft: BehaviorSnapshotDraft) -> Result<Self> {
        check_non_negative("averageDailyXp", draft.average_daily_xp)?;
        check_range("habitCompletionRate", draft.habit_completion_rate, 0.0, 1.0)?;
        check_range("streakStabilityIndex", draft.streak_stability_index, 0.0, 1.0)?;
        check_range("burnoutRiskScore", draft.burnout_risk_score, 0.0, 100.0)?;
        check_range("goalEngagementRate", draft.goal_engagement_rate, 0.0, 1.0)?;
        Ok(Self {
            date: draft.date,
            average_daily_xp: draft.average_daily_xp,
            habit_completion_rate: draft.habit_completion_rate,
            streak_stability_index: draft.streak_stability_index,
            burnout_risk_score: draft.burnout_risk_score,
            active_goal_count: draft.active_goal_count,
            goal_engagement_rate: draft.goal_engagement_rate,
        })
    }
}

impl From<BehaviorSnapshot> for BehaviorSnapshotDraft {
    fn from(snapshot: BehaviorSnapshot) -> Self {
        Self {
            date: snapshot.date,
            average_daily_xp: snapshot.average_daily_xp,
            habit_completion_rate: snapshot.habit_completion_rate,
            streak_stability_index: snapshot.streak_stability_index,
            burnout_risk_score: snapshot.burnout_risk_score,
            active_goal_count: snapshot.active_goal_count,
            goal_engagement_rate: snapshot.goal_engagement_rate,
        }
    }
}

impl BehaviorSnapshot {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn average_daily_xp(&self) -> f64 {
        self.average_daily_xp
    }

    pub fn habit_completion_rate(&self) -> f64 {
        self.habit_completion_rate
    }

    pub fn streak_stability_index(&self) -> f64 {
        self.streak_stability_index
    }

    pub fn burnout_risk_score(&self) -> f64 {
        self.burnout_risk_score
    }

    pub fn active_goal_count(&self) -> u32 {
        self.active_goal_count
    }

    pub fn goal_engagement_rate(&self) -> f64 {
        self.goal_engagement_rate
    }

    pub fn metric(&self, metric: BehaviorMetric) -> f64 {
        match metric {
            BehaviorMetric::AverageDailyXp => self.average_daily_xp,
            BehaviorMetric::HabitCompletionRate => self.habit_completion_rate,
            BehaviorMetric::StreakStabilityIndex => self.streak_stability_index,
            BehaviorMetric::BurnoutRiskScore => self.burnout_risk_score,
            BehaviorMetric::ActiveGoalCount => self.active_goal_count as f64,
            BehaviorMetric::GoalEngagementRate => self.goal_engagement_rate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BehaviorMetric {
    AverageDailyXp,
    HabitCompletionRate,
    StreakStabilityIndex,
    BurnoutRiskScore,
    ActiveGoalCount,
    GoalEngagementRate,
}

impl BehaviorMetric {
    pub const ALL: [BehaviorMetric; 6] = [
        BehaviorMetric::AverageDailyXp,
        BehaviorMetric::HabitCompletionRate,
        BehaviorMetric::StreakStabilityIndex,
        BehaviorMetric::BurnoutRiskScore,
        BehaviorMetric::ActiveGoalCount,
        BehaviorMetric::GoalEngagementRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorMetric::AverageDailyXp => "averageDailyXp",
            BehaviorMetric::HabitCompletionRate => "habitCompletionRate",
            BehaviorMetric::StreakStabilityIndex => "streakStabilityIndex",
            BehaviorMetric::BurnoutRiskScore => "burnoutRiskScore",
            BehaviorMetric::ActiveGoalCount => "activeGoalCount",
            BehaviorMetric::GoalEngagementRate => "goalEngagementRate",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftType {
    Improvement,
    Decline,
    Burnout,
    Stagnation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftEvent {
    pub(crate) drift_type: DriftType,
    pub(crate) severity: Severity,
    pub(crate) earlier: BehaviorSnapshot,
    pub(crate) later: BehaviorSnapshot,
    pub(crate) detected_on: NaiveDate,
    pub(crate) affected_metrics: BTreeMap<BehaviorMetric, f64>,
    pub(crate) explanation: String,
    pub(crate) days_between: i64,
}

impl DriftEvent {
    pub fn drift_type(&self) -> DriftType {
        self.drift_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn earlier(&self) -> &BehaviorSnapshot {
        &self.earlier
    }

    pub fn later(&self) -> &BehaviorSnapshot {
        &self.later
    }

    pub fn detected_on(&self) -> NaiveDate {
        self.detected_on
    }

    // Signed `later - earlier` delta for every tracked metric.
    pub fn affected_metrics(&self) -> &BTreeMap<BehaviorMetric, f64> {
        &self.affected_metrics
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn days_between(&self) -> i64 {
        self.days_between
    }
}
