//! Case analysts: heuristic, live, and live-with-fallback
//!
//! Every analyst produces a [`NarrativeReport`]. Penalty figures are always
//! taken from the rule table, whichever analyst wrote the rest of the report.

use crate::analysis::AssessOptions;
use crate::case::CaseRecord;
use crate::config::{duration_millis, AiSettings, ResolvedConfig};
use crate::error::{AssessError, AssessResult};
use crate::narrative::{
    compose_narrative, likely_penalties, CourtPreparation, NarrativeReport, ReportSource,
    RiskAssessment, DISCLAIMER,
};
use crate::penalty::NSW_RULE_TABLE;
use crate::rate_limit::RateLimiter;
use crate::risk::RiskLevel;
use crate::scoring::{case_score, clamp_score};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are an experienced DUI defense lawyer practising in New South Wales. \
You know the Road Transport Act 2013, drink driving penalties, licence suspension and interlock \
requirements, police testing procedures and Local Court practice. Respond with structured JSON \
containing risk assessment, likely penalties, defense opportunities and practical next steps.";

/// Produces a narrative report for a case
pub trait CaseAnalyst: Send + Sync {
    fn name(&self) -> &'static str;

    /// True when the analyst may call an external service
    fn is_live(&self) -> bool {
        false
    }

    /// Analyze a case already checked by [`CaseRecord::validate`]
    ///
    /// [`analyze_case`] is the validating entry point.
    fn analyze(&self, case: &CaseRecord) -> AssessResult<NarrativeReport>;
}

/// Template-based analyst, no external calls
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyst {
    options: AssessOptions,
}

impl HeuristicAnalyst {
    pub fn new(options: AssessOptions) -> Self {
        HeuristicAnalyst { options }
    }
}

impl CaseAnalyst for HeuristicAnalyst {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn analyze(&self, case: &CaseRecord) -> AssessResult<NarrativeReport> {
        compose_narrative(case, &self.options)
    }
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Report fields taken from live text
///
/// `likelyPenalties` is not read since the rule table supplies it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveReport {
    risk_assessment: LiveRisk,
    defense_opportunities: Vec<String>,
    recommended_next_steps: Vec<String>,
    mitigation_strategies: Vec<String>,
    court_preparation: CourtPreparation,
    #[serde(default)]
    disclaimer: Option<String>,
}

#[derive(Deserialize)]
struct LiveRisk {
    level: RiskLevel,
    #[serde(default)]
    factors: Vec<String>,
    #[serde(default)]
    score: Option<f64>,
}

/// Analyst backed by a remote messages endpoint
pub struct LiveAnalyst {
    client: Client,
    settings: AiSettings,
    api_key: String,
    options: AssessOptions,
}

impl std::fmt::Debug for LiveAnalyst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveAnalyst")
            .field("endpoint", &self.settings.endpoint)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl LiveAnalyst {
    pub fn new(settings: AiSettings, api_key: String, options: AssessOptions) -> AssessResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AssessError::LiveService(format!("failed to build HTTP client: {}", e)))?;
        Ok(LiveAnalyst {
            client,
            settings,
            api_key,
            options,
        })
    }

    fn request_text(&self, case: &CaseRecord) -> AssessResult<String> {
        let body = MessageRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: 0.3,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: case_prompt(case),
            }],
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .map_err(|e| AssessError::LiveService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssessError::LiveService(format!(
                "endpoint returned {}",
                status
            )));
        }

        let parsed: MessageResponse = response
            .json()
            .map_err(|e| AssessError::LiveService(format!("malformed response body: {}", e)))?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| AssessError::LiveService("response had no text content".to_string()))
    }
}

impl CaseAnalyst for LiveAnalyst {
    fn name(&self) -> &'static str {
        "live"
    }

    fn is_live(&self) -> bool {
        true
    }

    fn analyze(&self, case: &CaseRecord) -> AssessResult<NarrativeReport> {
        let text = self.request_text(case)?;
        tracing::debug!(bytes = text.len(), "live analyst responded");
        report_from_text(&text, case, &self.options)
    }
}

/// Turn live response text into a report
///
/// JSON text (optionally wrapped in prose or a code fence) is parsed as a
/// report. Anything else yields the heuristic report with the text attached.
/// A fractional score is rounded and a missing one is computed from the case.
pub fn report_from_text(
    text: &str,
    case: &CaseRecord,
    options: &AssessOptions,
) -> AssessResult<NarrativeReport> {
    match parse_report_json(text) {
        Some(live) => {
            let charges = case.charges(options.charge_mode)?.charges;
            let score = match live.risk_assessment.score {
                Some(raw) => clamp_score(raw),
                None => case_score(case.bac_level, case.prior_offenses),
            };
            Ok(NarrativeReport {
                risk_assessment: RiskAssessment {
                    level: live.risk_assessment.level,
                    factors: live.risk_assessment.factors,
                    score,
                },
                likely_penalties: likely_penalties(case, &charges)?,
                defense_opportunities: live.defense_opportunities,
                recommended_next_steps: live.recommended_next_steps,
                mitigation_strategies: live.mitigation_strategies,
                court_preparation: live.court_preparation,
                source: ReportSource::Live,
                disclaimer: Some(live.disclaimer.unwrap_or_else(|| DISCLAIMER.to_string())),
                raw_response: None,
            })
        }
        None => {
            tracing::warn!("live response was not a JSON report, using heuristic structure");
            let mut report = compose_narrative(case, options)?;
            report.raw_response = Some(text.to_string());
            Ok(report)
        }
    }
}

fn parse_report_json(text: &str) -> Option<LiveReport> {
    let trimmed = text.trim();
    if let Ok(report) = serde_json::from_str(trimmed) {
        return Some(report);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn or_unspecified(field: &Option<String>) -> &str {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Not specified")
}

fn case_prompt(case: &CaseRecord) -> String {
    let age = case
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Not specified".to_string());
    format!(
        "Analyze this NSW DUI case.\n\n\
         Case details:\n\
         - BAC Level: {:.3}\n\
         - Prior Offenses: {}\n\
         - Additional Charges: {}\n\
         - Arrest Date: {}\n\
         - Location: {}\n\
         - Test Type: {}\n\
         - Reason for Stop: {}\n\
         - Time of Day: {}\n\
         - License Type: {}\n\
         - Age: {}\n\n\
         Additional circumstances: {}\n\
         Medical conditions: {}\n\
         Medications: {}\n\n\
         Reply with a single JSON object with the keys riskAssessment \
         {{level, factors, score}}, likelyPenalties {{fine, licenseSuspension, interlock, \
         imprisonment, communityService}}, defenseOpportunities, recommendedNextSteps, \
         mitigationStrategies and courtPreparation {{timeline, requiredDocuments, expectations}}.",
        case.bac_level,
        case.prior_offenses,
        if case.additional_charges.is_empty() {
            "None".to_string()
        } else {
            case.additional_charges.join(", ")
        },
        or_unspecified(&case.arrest_date),
        case.location.as_deref().unwrap_or("NSW"),
        or_unspecified(&case.test_type),
        or_unspecified(&case.reason),
        or_unspecified(&case.time_of_day),
        case.license_type.as_deref().unwrap_or("Full"),
        age,
        case.additional_circumstances.as_deref().unwrap_or("None provided"),
        case.medical_conditions().unwrap_or("None reported"),
        case.medications().unwrap_or("None reported"),
    )
}

/// Live analyst guarded by a rate limiter, falling back to the heuristic
///
/// Live failures are logged and never returned. Validation errors are.
pub struct FallbackAnalyst {
    heuristic: HeuristicAnalyst,
    live: Option<Box<dyn CaseAnalyst>>,
    limiter: RateLimiter,
    client_key: String,
}

impl FallbackAnalyst {
    pub fn new(
        heuristic: HeuristicAnalyst,
        live: Option<Box<dyn CaseAnalyst>>,
        limiter: RateLimiter,
    ) -> Self {
        FallbackAnalyst {
            heuristic,
            live,
            limiter,
            client_key: "local".to_string(),
        }
    }

    /// Key the rate limiter counts calls against
    pub fn with_client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = key.into();
        self
    }

    fn try_live(&self, live: &dyn CaseAnalyst, case: &CaseRecord) -> AssessResult<NarrativeReport> {
        if !self.limiter.allow(&self.client_key) {
            return Err(AssessError::RateLimited);
        }
        live.analyze(case)
    }
}

impl CaseAnalyst for FallbackAnalyst {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn is_live(&self) -> bool {
        self.live.is_some()
    }

    fn analyze(&self, case: &CaseRecord) -> AssessResult<NarrativeReport> {
        if let Some(live) = &self.live {
            match self.try_live(live.as_ref(), case) {
                Ok(report) => return Ok(report),
                Err(e) if e.is_validation() => return Err(e),
                Err(e) => {
                    tracing::warn!(analyst = live.name(), error = %e, "live analysis failed, using heuristic report");
                }
            }
        }
        self.heuristic.analyze(case)
    }
}

/// Pick the analyst the configuration allows
///
/// Without a usable API key only the heuristic analyst is available.
pub fn analyst_from_config(config: &ResolvedConfig) -> Box<dyn CaseAnalyst> {
    let options = config.assess_options();
    let heuristic = HeuristicAnalyst::new(options);
    let Some(key) = config.api_key() else {
        tracing::info!("no AI API key configured, using heuristic analyst");
        return Box::new(heuristic);
    };

    match LiveAnalyst::new(config.ai.clone(), key.to_string(), options) {
        Ok(live) => {
            tracing::info!(model = %config.ai.model, endpoint = %config.ai.endpoint, "live analyst enabled");
            Box::new(FallbackAnalyst::new(
                heuristic,
                Some(Box::new(live)),
                RateLimiter::new(config.rate_limit),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "live analyst unavailable, using heuristic analyst");
            Box::new(heuristic)
        }
    }
}

/// Validate a case, then analyze it
pub fn analyze_case(case: &CaseRecord, analyst: &dyn CaseAnalyst) -> AssessResult<NarrativeReport> {
    case.validate()?;
    analyst.analyze(case)
}

/// Service status summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub mock_mode: bool,
    pub provider: String,
    pub model: Option<String>,
    pub rule_table_version: String,
    pub jurisdiction: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
}

pub fn health(config: &ResolvedConfig) -> HealthReport {
    let live = config.api_key().is_some();
    HealthReport {
        status: "ok".to_string(),
        mock_mode: !live,
        provider: if live { "live" } else { "heuristic" }.to_string(),
        model: live.then(|| config.ai.model.clone()),
        rule_table_version: NSW_RULE_TABLE.version().to_string(),
        jurisdiction: NSW_RULE_TABLE.jurisdiction().to_string(),
        rate_limit_window_ms: duration_millis(config.rate_limit.window),
        rate_limit_max: config.rate_limit.max_requests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::build_narrative;
    use crate::rate_limit::RateLimitConfig;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    struct FailingAnalyst(AssessError);

    impl CaseAnalyst for FailingAnalyst {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn analyze(&self, _case: &CaseRecord) -> AssessResult<NarrativeReport> {
            Err(self.0.clone())
        }
    }

    fn settings(endpoint: &str) -> AiSettings {
        let mut config = ResolvedConfig::defaults().unwrap();
        config.ai.endpoint = endpoint.to_string();
        config.ai.timeout = Duration::from_millis(2000);
        config.ai
    }

    fn live_report_json() -> String {
        let mut report = build_narrative(&CaseRecord::new(0.09, 0), &AssessOptions::default()).unwrap();
        report.risk_assessment.factors = vec!["Model-written factor".to_string()];
        report.likely_penalties.fine = crate::penalty::Range::new(1, 2);
        report.disclaimer = None;
        serde_json::to_string(&report).unwrap()
    }

    /// Serve one canned HTTP response on an ephemeral port
    fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/v1/messages", addr)
    }

    fn messages_body(text: &str) -> String {
        serde_json::json!({
            "content": [{"type": "text", "text": text}]
        })
        .to_string()
    }

    #[test]
    fn test_heuristic_analyst() {
        let report = HeuristicAnalyst::default()
            .analyze(&CaseRecord::new(0.16, 0))
            .unwrap();
        assert_eq!(report.source, ReportSource::Heuristic);
        assert_eq!(report.risk_assessment.level, RiskLevel::High);
    }

    #[test]
    fn test_json_text_keeps_rule_table_penalties() {
        let case = CaseRecord::new(0.09, 0);
        let text = format!("Here is the analysis:\n```json\n{}\n```", live_report_json());
        let report = report_from_text(&text, &case, &AssessOptions::default()).unwrap();
        assert_eq!(report.source, ReportSource::Live);
        assert_eq!(report.risk_assessment.factors, vec!["Model-written factor"]);
        assert_eq!(report.likely_penalties.fine, crate::penalty::Range::new(2200, 3300));
        assert!(report.disclaimer.is_some());
    }

    fn with_risk_field(key: &str, value: serde_json::Value) -> String {
        let mut json: serde_json::Value = serde_json::from_str(&live_report_json()).unwrap();
        json["riskAssessment"][key] = value;
        json.to_string()
    }

    #[test]
    fn test_float_penalty_figures_keep_live_report() {
        let mut json: serde_json::Value = serde_json::from_str(&live_report_json()).unwrap();
        json["likelyPenalties"]["fine"] = serde_json::json!({"min": 2200.0, "max": 3300.0});
        json["likelyPenalties"]["licenseSuspension"] = serde_json::json!("6-12 months");
        let case = CaseRecord::new(0.09, 0);
        let report = report_from_text(&json.to_string(), &case, &AssessOptions::default()).unwrap();
        assert_eq!(report.source, ReportSource::Live);
        assert_eq!(report.risk_assessment.factors, vec!["Model-written factor"]);
        assert_eq!(report.likely_penalties.fine, crate::penalty::Range::new(2200, 3300));
        assert_eq!(report.likely_penalties.license_suspension, crate::penalty::Range::new(6, 12));
    }

    #[test]
    fn test_fractional_score_rounded_and_clamped() {
        let case = CaseRecord::new(0.09, 0);
        let options = AssessOptions::default();

        let report =
            report_from_text(&with_risk_field("score", serde_json::json!(42.5)), &case, &options)
                .unwrap();
        assert_eq!(report.source, ReportSource::Live);
        assert_eq!(report.risk_assessment.factors, vec!["Model-written factor"]);
        assert_eq!(report.risk_assessment.score, 43);

        let report =
            report_from_text(&with_risk_field("score", serde_json::json!(250)), &case, &options)
                .unwrap();
        assert_eq!(report.risk_assessment.score, 100);

        let report = report_from_text(
            &with_risk_field("score", serde_json::Value::Null),
            &case,
            &options,
        )
        .unwrap();
        assert_eq!(report.source, ReportSource::Live);
        assert_eq!(report.risk_assessment.score, case_score(0.09, 0));
    }

    #[test]
    fn test_plain_text_attaches_raw_response() {
        let case = CaseRecord::new(0.09, 0);
        let report =
            report_from_text("The outlook is moderate.", &case, &AssessOptions::default()).unwrap();
        assert_eq!(report.source, ReportSource::Heuristic);
        assert_eq!(report.raw_response.as_deref(), Some("The outlook is moderate."));
        assert_eq!(report.likely_penalties.fine, crate::penalty::Range::new(2200, 3300));
    }

    #[test]
    fn test_live_analyst_against_local_server() {
        let endpoint = serve_once("200 OK", messages_body(&live_report_json()));
        let live = LiveAnalyst::new(settings(&endpoint), "sk-test".into(), AssessOptions::default())
            .unwrap();
        let report = live.analyze(&CaseRecord::new(0.09, 0)).unwrap();
        assert_eq!(report.source, ReportSource::Live);
        assert_eq!(report.likely_penalties.fine, crate::penalty::Range::new(2200, 3300));
    }

    #[test]
    fn test_live_analyst_error_status() {
        let endpoint = serve_once("500 Internal Server Error", "{}".to_string());
        let live = LiveAnalyst::new(settings(&endpoint), "sk-test".into(), AssessOptions::default())
            .unwrap();
        assert!(matches!(
            live.analyze(&CaseRecord::new(0.09, 0)).unwrap_err(),
            AssessError::LiveService(_)
        ));
    }

    #[test]
    fn test_fallback_on_unreachable_endpoint() {
        let live = LiveAnalyst::new(
            settings("http://127.0.0.1:9/v1/messages"),
            "sk-test".into(),
            AssessOptions::default(),
        )
        .unwrap();
        let analyst = FallbackAnalyst::new(
            HeuristicAnalyst::default(),
            Some(Box::new(live)),
            RateLimiter::default(),
        );
        let report = analyst.analyze(&CaseRecord::new(0.09, 0)).unwrap();
        assert_eq!(report.source, ReportSource::Heuristic);
        assert!(report.raw_response.is_none());
    }

    #[test]
    fn test_fallback_when_rate_limited() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 1,
        });
        let endpoint = serve_once("200 OK", messages_body(&live_report_json()));
        let live = LiveAnalyst::new(settings(&endpoint), "sk-test".into(), AssessOptions::default())
            .unwrap();
        let analyst = FallbackAnalyst::new(HeuristicAnalyst::default(), Some(Box::new(live)), limiter);
        let case = CaseRecord::new(0.09, 0);
        assert_eq!(analyst.analyze(&case).unwrap().source, ReportSource::Live);
        assert_eq!(analyst.analyze(&case).unwrap().source, ReportSource::Heuristic);
    }

    #[test]
    fn test_fallback_surfaces_validation_errors() {
        let analyst = FallbackAnalyst::new(
            HeuristicAnalyst::default(),
            Some(Box::new(FailingAnalyst(AssessError::UnknownCharge("SPEEDING".into())))),
            RateLimiter::default(),
        );
        assert_eq!(
            analyst.analyze(&CaseRecord::new(0.1, 0)).unwrap_err(),
            AssessError::UnknownCharge("SPEEDING".into())
        );

        let analyst = FallbackAnalyst::new(
            HeuristicAnalyst::default(),
            Some(Box::new(FailingAnalyst(AssessError::LiveService("down".into())))),
            RateLimiter::default(),
        );
        let err = analyze_case(&CaseRecord::new(1.5, 0), &analyst).unwrap_err();
        assert!(err.is_validation());
        assert!(analyze_case(&CaseRecord::new(0.1, 0), &analyst).is_ok());
    }

    #[test]
    fn test_analyst_from_config() {
        let mut config = ResolvedConfig::defaults().unwrap();
        assert_eq!(analyst_from_config(&config).name(), "heuristic");
        config.ai.api_key = Some("your_api_key_here".into());
        assert_eq!(analyst_from_config(&config).name(), "heuristic");
        config.ai.api_key = Some("sk-real".into());
        let analyst = analyst_from_config(&config);
        assert_eq!(analyst.name(), "fallback");
        assert!(analyst.is_live());
    }

    #[test]
    fn test_analyze_case_validates_first() {
        let analyst = FailingAnalyst(AssessError::LiveService("unreachable".into()));
        assert_eq!(
            analyze_case(&CaseRecord::new(0.09, -1), &analyst).unwrap_err(),
            AssessError::NegativePriorOffenses(-1)
        );
    }

    #[test]
    fn test_health() {
        let mut config = ResolvedConfig::defaults().unwrap();
        let report = health(&config);
        assert!(report.mock_mode);
        assert_eq!(report.provider, "heuristic");
        assert_eq!(report.rule_table_version, "nsw-rta-2013");
        config.ai.api_key = Some("sk-real".into());
        let report = health(&config);
        assert!(!report.mock_mode);
        assert_eq!(report.model.as_deref(), Some(crate::config::DEFAULT_MODEL));

        config.rate_limit.window = Duration::MAX;
        assert_eq!(health(&config).rate_limit_window_ms, u64::MAX);
    }

    #[test]
    fn test_prompt_includes_case_facts() {
        let mut case = CaseRecord::new(0.083, 1);
        case.medications = Some("insulin".into());
        let prompt = case_prompt(&case);
        assert!(prompt.contains("BAC Level: 0.083"));
        assert!(prompt.contains("Medications: insulin"));
        assert!(prompt.contains("License Type: Full"));
    }
}
