//! Text and JSON rendering for assessments, narratives and the rule table

use crate::analysis::PenaltyAssessment;
use crate::classify::{BacRange, OffenseCategory};
use crate::defense::DefenseStrategies;
use crate::error::AssessResult;
use crate::narrative::NarrativeReport;
use crate::penalty::{PenaltyBundle, Range, RuleTable};
use crate::recommend::Recommendations;
use serde::Serialize;

/// One rule table row, flattened for output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub bac_range: BacRange,
    pub offense_category: OffenseCategory,
    pub penalty: PenaltyBundle,
}

pub fn table_rows(table: &RuleTable) -> Vec<TableRow> {
    table
        .rows()
        .map(|(bac_range, offense_category, row)| TableRow {
            bac_range,
            offense_category,
            penalty: row.to_bundle(),
        })
        .collect()
}

/// Render any serializable value as pretty JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// 2200 -> "2,200"
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn money(range: &Range) -> String {
    if range.is_zero() {
        "-".to_string()
    } else {
        format!("${} - ${}", thousands(range.min), thousands(range.max))
    }
}

fn span(range: &Range, unit: &str) -> String {
    if range.is_zero() {
        "-".to_string()
    } else {
        format!("{}-{} {}", range.min, range.max, unit)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn bullets(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("\n{}:\n", title));
    for item in items {
        output.push_str(&format!("  - {}\n", item));
    }
}

fn push_bundle(output: &mut String, bundle: &PenaltyBundle) {
    output.push_str(&format!("  Fine:               {}\n", money(&bundle.fine)));
    output.push_str(&format!(
        "  License suspension: {}\n",
        span(&bundle.license_suspension, "months")
    ));
    output.push_str(&format!("  Prison term:        {}\n", span(&bundle.prison_term, "months")));
    output.push_str(&format!(
        "  Interlock:          {}\n",
        yes_no(bundle.interlock_required)
    ));
    output.push_str(&format!(
        "  Community service:  {}\n",
        span(&bundle.community_service, "hours")
    ));
}

pub fn render_assessment_text(assessment: &PenaltyAssessment) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "BAC {:.3}: {} / {}\n",
        assessment.bac_level,
        assessment.bac_range.label(),
        assessment.offense_category.label()
    ));
    output.push_str(&format!("  Risk level:         {}\n", assessment.risk_level.as_str()));
    push_bundle(&mut output, &assessment.penalty);
    if !assessment.additional_charges.is_empty() {
        let names: Vec<&str> = assessment
            .additional_charges
            .iter()
            .map(|c| c.as_str())
            .collect();
        output.push_str(&format!("  Additional charges: {}\n", names.join(", ")));
    }
    if !assessment.ignored_charges.is_empty() {
        output.push_str(&format!(
            "  Ignored charges:    {}\n",
            assessment.ignored_charges.join(", ")
        ));
    }
    output.push_str(&format!("  {}\n", assessment.penalty.description));
    output
}

/// Batch results, one line per request in input order
pub fn render_batch_text(results: &[AssessResult<PenaltyAssessment>]) -> String {
    let mut output = format!(
        "{:<4} {:<8} {:<14} {:<10} {:<20} {:<12} {:<9} {}\n",
        "#", "BAC", "RANGE", "CATEGORY", "FINE", "SUSPENSION", "INTERLOCK", "RISK"
    );
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(a) => output.push_str(&format!(
                "{:<4} {:<8} {:<14} {:<10} {:<20} {:<12} {:<9} {}\n",
                i + 1,
                format!("{:.3}", a.bac_level),
                a.bac_range.as_str(),
                a.offense_category.as_str(),
                money(&a.penalty.fine),
                span(&a.penalty.license_suspension, "mo"),
                yes_no(a.penalty.interlock_required),
                a.risk_level.as_str(),
            )),
            Err(e) => output.push_str(&format!("{:<4} error: {}\n", i + 1, e)),
        }
    }
    output
}

pub fn render_table_text(table: &RuleTable) -> String {
    let mut output = format!(
        "Rule table {} ({})\n\n{:<14} {:<10} {:<20} {:<12} {:<10} {}\n",
        table.version(),
        table.jurisdiction(),
        "RANGE",
        "CATEGORY",
        "FINE",
        "SUSPENSION",
        "PRISON",
        "INTERLOCK"
    );
    for (range, category, row) in table.rows() {
        let bundle = row.to_bundle();
        output.push_str(&format!(
            "{:<14} {:<10} {:<20} {:<12} {:<10} {}\n",
            range.as_str(),
            category.as_str(),
            money(&bundle.fine),
            span(&bundle.license_suspension, "mo"),
            span(&bundle.prison_term, "mo"),
            yes_no(bundle.interlock_required),
        ));
    }
    output
}

pub fn render_narrative_text(report: &NarrativeReport) -> String {
    let risk = &report.risk_assessment;
    let penalties = &report.likely_penalties;
    let mut output = format!(
        "Risk: {} (score {}/100)\n",
        risk.level.label(),
        risk.score
    );
    for factor in &risk.factors {
        output.push_str(&format!("  - {}\n", factor));
    }

    output.push_str("\nLikely penalties:\n");
    output.push_str(&format!("  Fine:               {}\n", money(&penalties.fine)));
    output.push_str(&format!(
        "  License suspension: {}\n",
        span(&penalties.license_suspension, "months")
    ));
    output.push_str(&format!(
        "  Interlock:          {}\n",
        match (penalties.interlock.required, penalties.interlock.duration.as_deref()) {
            (true, Some(d)) => format!("yes ({})", d),
            (required, _) => yes_no(required).to_string(),
        }
    ));
    output.push_str(&format!(
        "  Imprisonment:       {}\n",
        penalties
            .imprisonment
            .duration
            .clone()
            .unwrap_or_else(|| yes_no(penalties.imprisonment.possible).to_string())
    ));
    if let Some(ref note) = penalties.note {
        output.push_str(&format!("  {}\n", note));
    }

    bullets(&mut output, "Defense opportunities", &report.defense_opportunities);
    bullets(&mut output, "Next steps", &report.recommended_next_steps);
    bullets(&mut output, "Mitigation", &report.mitigation_strategies);

    let prep = &report.court_preparation;
    output.push_str(&format!("\nCourt preparation ({}):\n", prep.timeline));
    for doc in &prep.required_documents {
        output.push_str(&format!("  - {}\n", doc));
    }
    output.push_str(&format!("  {}\n", prep.expectations));

    if let Some(ref raw) = report.raw_response {
        output.push_str(&format!("\nAnalyst notes:\n{}\n", raw.trim()));
    }
    if let Some(ref disclaimer) = report.disclaimer {
        output.push_str(&format!("\n{}\n", disclaimer));
    }
    output
}

pub fn render_defense_text(defenses: &DefenseStrategies) -> String {
    let mut output = String::new();
    bullets(&mut output, "Strategies", &defenses.strategies);
    bullets(&mut output, "Technical defenses", &defenses.technical_defenses);
    bullets(&mut output, "Mitigation arguments", &defenses.mitigation_arguments);
    output.trim_start().to_string()
}

pub fn render_recommendations_text(recs: &Recommendations) -> String {
    let mut output = String::new();
    bullets(&mut output, "Immediate", &recs.immediate);
    bullets(&mut output, "Mitigation", &recs.mitigation);
    output.push_str("\nTimeline:\n");
    for phase in &recs.timeline {
        match phase.date {
            Some(ref date) => output.push_str(&format!("  {} [{}]\n", phase.phase, date)),
            None => output.push_str(&format!("  {}\n", phase.phase)),
        }
        for task in &phase.tasks {
            output.push_str(&format!("    - {}\n", task));
        }
    }
    output.trim_start().to_string()
}
