use super::error::{Result, TrajectoryError};
use super::types::{BurnoutRisk, TrajectoryView, YearlyProjection};

// Renders the narrative for a trajectory. Each section is picked from
// threshold bands on its own metric, so sections never depend on each other.
pub fn explain(view: TrajectoryView<'_>, consistency_score: f64) -> Result<String> {
    let (Some(first), Some(last)) = (view.projections.first(), view.projections.last()) else {
        return Err(TrajectoryError::precondition(
            "cannot explain a trajectory without projections",
        ));
    };

    let mut sections = Vec::with_capacity(6);
    sections.push(overview(view.projections.len(), first, last, consistency_score));
    sections.push(
        view.projections
            .iter()
            .map(year_line)
            .collect::<Vec<_>>()
            .join("\n"),
    );
    sections.push(skill_section(view.average_skill_growth));
    sections.push(burnout_section(view.burnout_risk));
    sections.push(format!(
        "Income outlook: an estimated {:.0} to {:.0} per year, with {:.0} as the most likely figure.",
        view.income_range.low(),
        view.income_range.high(),
        view.income_range.expected()
    ));
    sections.push(emigration_section(view.emigration_probability));

    Ok(sections.join("\n\n"))
}

fn overview(years: usize, first: &YearlyProjection, last: &YearlyProjection, consistency: f64) -> String {
    let consistency_note = if consistency >= 80.0 {
        "excellent consistency keeps this trajectory on track"
    } else if consistency >= 60.0 {
        "good consistency supports steady progress"
    } else if consistency >= 40.0 {
        "uneven consistency is holding progress back"
    } else {
        "low consistency is the main drag on progress"
    };
    let plural = if years == 1 { "" } else { "s" };
    format!(
        "Over the next {years} year{plural} you are projected to reach {} XP (level {}), starting from level {} after year one; {consistency_note} (consistency {consistency:.0}/100).",
        last.projected_xp(),
        last.projected_level(),
        first.projected_level(),
    )
}

fn year_line(projection: &YearlyProjection) -> String {
    let rate = projection.xp_growth_rate();
    let label = if rate < -10.0 {
        "growth is declining and the trajectory is at risk"
    } else if rate < 0.0 {
        "growth is slowing"
    } else if rate > 50.0 {
        "strong growth"
    } else if rate > 20.0 {
        "healthy growth"
    } else {
        "modest growth"
    };
    format!(
        "Year {}: {} XP, level {}, {rate:+.1}% XP growth ({label}).",
        projection.year(),
        projection.projected_xp(),
        projection.projected_level(),
    )
}

fn skill_section(average: f64) -> String {
    let label = if average >= 70.0 {
        "exceptional skill growth: your habits and goals are building durable capability"
    } else if average >= 50.0 {
        "solid skill growth with room to deepen goal engagement"
    } else if average >= 30.0 {
        "moderate skill growth; activity is not fully turning into capability"
    } else {
        "limited skill growth; add focused goals to turn activity into progress"
    };
    format!("Skill growth index averages {average:.1}/100: {label}.")
}

fn burnout_section(risk: BurnoutRisk) -> String {
    let text = match risk {
        BurnoutRisk::Low => "Burnout risk is low; the current pace looks sustainable.",
        BurnoutRisk::Medium => {
            "Burnout risk is medium; watch for fatigue and schedule recovery time."
        }
        BurnoutRisk::High => {
            "Burnout risk is high; the current load is unlikely to be sustainable without changes."
        }
    };
    text.to_string()
}

fn emigration_section(probability: f64) -> String {
    let label = if probability >= 70.0 {
        "high: your skills and earning potential would travel well"
    } else if probability >= 40.0 {
        "moderate: relocation is a realistic option as skills mature"
    } else {
        "low at this stage of the trajectory"
    };
    format!("Emigration likelihood is {probability:.0}%, {label}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IncomeRange;

    fn projection(year: u32, xp: u64, rate: f64) -> YearlyProjection {
        YearlyProjection::new(year, xp, 3, 40.0, rate).expect("valid projection")
    }

    fn view<'a>(
        projections: &'a [YearlyProjection],
        income: &'a IncomeRange,
        skill: f64,
        risk: BurnoutRisk,
        emigration: f64,
    ) -> TrajectoryView<'a> {
        TrajectoryView {
            projections,
            average_skill_growth: skill,
            burnout_risk: risk,
            income_range: income,
            emigration_probability: emigration,
        }
    }

    #[test]
    fn every_section_is_present() {
        let income = IncomeRange::new(30_000.0, 40_000.0, 50_000.0).expect("valid income");
        let years = [projection(1, 1_000, 60.0), projection(2, 1_300, 30.0)];
        let text = explain(view(&years, &income, 55.0, BurnoutRisk::Medium, 45.0), 85.0)
            .expect("explanation");

        assert!(text.contains("Over the next 2 years"));
        assert!(text.contains("Year 1: 1000 XP"));
        assert!(text.contains("strong growth"));
        assert!(text.contains("healthy growth"));
        assert!(text.contains("solid skill growth"));
        assert!(text.contains("Burnout risk is medium"));
        assert!(text.contains("30000 to 50000"));
        assert!(text.contains("moderate: relocation"));
        assert!(text.contains("excellent consistency"));
    }

    #[test]
    fn bands_follow_metric_thresholds() {
        let income = IncomeRange::new(0.0, 0.0, 0.0).expect("valid income");
        let years = [projection(1, 100, -15.0), projection(2, 100, -5.0), projection(3, 100, 10.0)];
        let text = explain(view(&years, &income, 10.0, BurnoutRisk::High, 75.0), 20.0)
            .expect("explanation");

        assert!(text.contains("declining and the trajectory is at risk"));
        assert!(text.contains("growth is slowing"));
        assert!(text.contains("modest growth"));
        assert!(text.contains("limited skill growth"));
        assert!(text.contains("Burnout risk is high"));
        assert!(text.contains("Emigration likelihood is 75%, high"));
        assert!(text.contains("low consistency"));
    }

    #[test]
    fn empty_trajectory_is_rejected() {
        let income = IncomeRange::new(0.0, 0.0, 0.0).expect("valid income");
        let err = explain(view(&[], &income, 10.0, BurnoutRisk::Low, 5.0), 50.0)
            .expect_err("must reject");
        assert!(matches!(err, TrajectoryError::Precondition(_)));
    }
}
