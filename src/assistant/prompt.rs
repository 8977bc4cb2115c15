//! Prompt assembly and reply cleanup

use regex::Regex;
use std::sync::OnceLock;

use crate::config::AssistantConfig;
use crate::context::{format_measurement, telemetry_summary};
use crate::diagnostics::management_guide;
use crate::types::{CropProfile, DiagnosticResult, Reading};

/// Assemble the full prompt for one user message.
///
/// Sections, in order: identity, scope guard, telemetry, diagnostic, crop
/// reference table, management guide, response guidelines, question.
pub fn build_prompt(
    config: &AssistantConfig,
    crop: &CropProfile,
    latest: Option<&Reading>,
    diagnostic: Option<&DiagnosticResult>,
    question: &str,
) -> String {
    let diagnostic_block = match diagnostic {
        Some(d) if !d.tips.is_empty() => format!(
            "Status: {}\n{}",
            d.status,
            d.tips.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n")
        ),
        Some(d) => format!("Status: {}", d.status),
        None => "No diagnostic has been computed yet.".to_string(),
    };

    format!(
        "You are {name}, an agronomy assistant for a crop monitoring system.\n\
         \n\
         SCOPE: Answer only questions about agronomy, crop health, irrigation, \
         soil and the telemetry below. Politely decline anything else. A bare \
         number such as 1, 2 or 3 is a menu choice, not a measurement.\n\
         \n\
         TELEMETRY:\n{telemetry}\n\
         \n\
         DIAGNOSTIC:\n{diagnostic_block}\n\
         \n\
         CROP REFERENCE:\n{reference}\n\
         \n\
         MANAGEMENT GUIDE:\n{guide}\n\
         \n\
         GUIDELINES:\n\
         - Menu 1: give the crop diagnosis using the diagnostic and reference ranges.\n\
         - Menu 2: report the current telemetry values with their units.\n\
         - Menu 3: {dashboard_hint}\n\
         - Be brief and practical. Say \"unknown\" when a value is unknown.\n\
         \n\
         QUESTION: {question}",
        name = config.name,
        telemetry = telemetry_summary(latest),
        reference = crop_reference(crop),
        guide = management_guide().join("\n"),
        dashboard_hint = config.dashboard_hint,
    )
}

/// Reference table rendered from a profile's configured ranges
pub fn crop_reference(crop: &CropProfile) -> String {
    let mut lines = vec![format!("{}: {}", crop.name, crop.description)];
    for (key, range) in crop.ranges() {
        let mut line = format!(
            "- {}: {} to {}",
            key.label(),
            format_measurement(key, range.min),
            format_measurement(key, range.max)
        );
        if let Some(ideal) = range.ideal {
            line.push_str(&format!(" (ideal {})", format_measurement(key, ideal)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn emphasis_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*|__|\*").expect("emphasis pattern is valid"))
}

/// Remove markdown emphasis markers so replies render in plain-text chat
pub fn plain_text(reply: &str) -> String {
    emphasis_pattern().replace_all(reply, "").trim().to_string()
}
