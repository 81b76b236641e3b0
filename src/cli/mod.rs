use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::core::{
    BehaviorSnapshot, DriftEvent, EffectivenessEvaluation, Recommendation, ScenarioImpactSummary,
    SimulationInput, SimulationResult, StandardLevelCurve, TrajectoryConfig, TrajectoryError,
    detect_drift_over_time_with, evaluate_effectiveness_with, evaluate_scenarios_with,
    generate_scenarios_with, recommend_with, simulate_with,
};

#[derive(Parser, Debug)]
#[command(
    name = "trajectory",
    about = "Trajectory simulator, recommendation engine and behaviour drift monitor for a gamified habit tracker"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Tracing filter, e.g. debug or trajectory=trace (falls back to RUST_LOG, then info)"
    )]
    pub log_level: Option<String>,
    #[arg(long, global = true, help = "Pretty-print the JSON report")]
    pub pretty: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Simulate one user, rank recommendations and quantify their what-if scenarios")]
    Plan {
        #[arg(long, help = "SimulationInput JSON file (camelCase keys)")]
        input: PathBuf,
        #[arg(long, help = "Policy override JSON file; omitted keys keep their defaults")]
        config: Option<PathBuf>,
    },
    #[command(about = "Scan a chronological snapshot history for behaviour drift")]
    Drift {
        #[arg(long, help = "JSON array of behaviour snapshots, oldest first")]
        snapshots: PathBuf,
        #[arg(long, help = "Detection date, YYYY-MM-DD; later snapshots are ignored")]
        as_of: NaiveDate,
        #[arg(long, help = "Policy override JSON file; omitted keys keep their defaults")]
        config: Option<PathBuf>,
    },
    #[command(about = "Score a stored scenario summary against the user's current state")]
    Evaluate {
        #[arg(long, help = "ScenarioImpactSummary JSON file, as emitted by plan")]
        expected: PathBuf,
        #[arg(long, help = "SimulationInput JSON file describing the user today")]
        actual: PathBuf,
        #[arg(long, help = "Policy override JSON file; omitted keys keep their defaults")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport {
    input: SimulationInput,
    baseline: SimulationResult,
    recommendations: Vec<Recommendation>,
    scenarios: Vec<ScenarioImpactSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DriftReport {
    as_of: NaiveDate,
    snapshot_count: usize,
    events: Vec<DriftEvent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationReport {
    scenario: String,
    actual: SimulationResult,
    evaluation: EffectivenessEvaluation,
}

pub fn run(cli: &Cli) -> Result<String, String> {
    match &cli.command {
        Command::Plan { input, config } => {
            let config = load_config(config.as_deref())?;
            let report = build_plan(&read_file(input)?, &config)?;
            to_json(&report, cli.pretty)
        }
        Command::Drift {
            snapshots,
            as_of,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let report = build_drift(&read_file(snapshots)?, *as_of, &config)?;
            to_json(&report, cli.pretty)
        }
        Command::Evaluate {
            expected,
            actual,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let report = build_evaluation(&read_file(expected)?, &read_file(actual)?, &config)?;
            to_json(&report, cli.pretty)
        }
    }
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<TrajectoryConfig, String> {
    match path {
        Some(path) => TrajectoryConfig::from_json(&read_file(path)?).map_err(core_error),
        None => Ok(TrajectoryConfig::default()),
    }
}

fn core_error(err: TrajectoryError) -> String {
    err.to_string()
}

fn to_json<T: Serialize>(report: &T, pretty: bool) -> Result<String, String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    rendered.map_err(|e| format!("Failed to encode report: {e}"))
}

fn build_plan(input_json: &str, config: &TrajectoryConfig) -> Result<PlanReport, String> {
    let input = serde_json::from_str::<SimulationInput>(input_json)
        .map_err(|e| format!("Invalid simulation input JSON: {e}"))?;

    let baseline =
        simulate_with(&input, &config.simulation, &StandardLevelCurve).map_err(core_error)?;
    let recommendations = recommend_with(&baseline, &config.recommendation).map_err(core_error)?;
    let scenarios = if recommendations.is_empty() {
        Vec::new()
    } else {
        let generated = generate_scenarios_with(&input, &recommendations, &config.scenario)
            .map_err(core_error)?;
        evaluate_scenarios_with(
            &input,
            &baseline,
            &generated,
            &config.simulation,
            &StandardLevelCurve,
        )
        .map_err(core_error)?
    };

    info!(
        years = input.years_to_simulate(),
        burnout_risk = %baseline.burnout_risk(),
        recommendations = recommendations.len(),
        scenarios = scenarios.len(),
        "plan ready"
    );

    Ok(PlanReport {
        input,
        baseline,
        recommendations,
        scenarios,
    })
}

fn build_drift(
    snapshots_json: &str,
    as_of: NaiveDate,
    config: &TrajectoryConfig,
) -> Result<DriftReport, String> {
    let snapshots = serde_json::from_str::<Vec<BehaviorSnapshot>>(snapshots_json)
        .map_err(|e| format!("Invalid snapshot JSON: {e}"))?;
    let events =
        detect_drift_over_time_with(&snapshots, as_of, &config.drift).map_err(core_error)?;

    info!(snapshots = snapshots.len(), events = events.len(), %as_of, "drift scan ready");

    Ok(DriftReport {
        as_of,
        snapshot_count: snapshots.len(),
        events,
    })
}

fn build_evaluation(
    expected_json: &str,
    actual_input_json: &str,
    config: &TrajectoryConfig,
) -> Result<EvaluationReport, String> {
    let expected = serde_json::from_str::<ScenarioImpactSummary>(expected_json)
        .map_err(|e| format!("Invalid scenario summary JSON: {e}"))?;
    let actual_input = serde_json::from_str::<SimulationInput>(actual_input_json)
        .map_err(|e| format!("Invalid simulation input JSON: {e}"))?;

    let actual =
        simulate_with(&actual_input, &config.simulation, &StandardLevelCurve).map_err(core_error)?;
    let evaluation = evaluate_effectiveness_with(&expected, &actual, &config.effectiveness);

    info!(
        scenario = expected.scenario().name(),
        score = evaluation.outcome().effectiveness_score(),
        "evaluation ready"
    );

    Ok(EvaluationReport {
        scenario: expected.scenario().name().to_string(),
        actual,
        evaluation,
    })
}
