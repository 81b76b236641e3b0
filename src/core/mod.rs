mod config;
mod drift;
mod effectiveness;
mod engine;
mod error;
mod explain;
mod levels;
mod recommend;
mod scenario;
mod types;

pub use config::{
    DriftPolicy, EffectivenessPolicy, RecommendationPolicy, ScenarioPolicy, SimulationModel,
    TrajectoryConfig,
};
pub use drift::{detect_drift, detect_drift_over_time, detect_drift_over_time_with, detect_drift_with};
pub use effectiveness::{evaluate_effectiveness, evaluate_effectiveness_with};
pub use engine::{simulate, simulate_with};
pub use error::{Result, TrajectoryError};
pub use explain::explain;
pub use levels::{LevelCurve, StandardLevelCurve};
pub use recommend::{recommend, recommend_with};
pub use scenario::{
    COMBINED_SCENARIO_NAME, evaluate_scenarios, evaluate_scenarios_with, generate_scenarios,
    generate_scenarios_with, scenario_name,
};
pub use types::{
    ActiveGoal, BehaviorMetric, BehaviorSnapshot, BehaviorSnapshotDraft, BurnoutRisk,
    BurnoutRiskChange, BurnoutWarning, DeviationReport, Difficulty, DriftEvent, DriftType,
    EffectivenessEvaluation, GeneratedScenario, Impact, IncomeRange, LearningSignal,
    MAX_YEARS, MIN_YEARS, OutcomeMetric, Recommendation, RecommendationOutcome,
    RecommendationType, ScenarioImpactSummary, Severity, SimulationInput, SimulationInputDraft,
    SimulationResult, TrajectoryView, YearlyProjection,
};
