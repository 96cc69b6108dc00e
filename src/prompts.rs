//! Prompt templates for extraction, analysis and synthesis.

use std::time::Duration;

use crate::state::Finding;

/// Prompt sent with every extraction request.
pub fn extraction(topic: &str) -> String {
    format!(
        "Extract key information about {topic}. Focus on facts, data, and expert opinions. \
         Analysis should be full of details and very comprehensive."
    )
}

/// Prompt for the per-iteration analyze-and-plan call.
pub fn analysis(topic: &str, findings: &[Finding], remaining: Duration) -> String {
    format!(
        r#"You are a research agent analyzing findings about: {topic}
You have {minutes} minutes remaining to complete the research but you don't need to use all of it.
Current findings: {findings}
What has been learned? What gaps remain? What specific aspects should be investigated next if any?
If you need to search for more information, include a nextSearchTopic.
If you need to search for more information in a specific URL, include a urlToSearch.
Important: Ensure the response is valid JSON. Do not include any characters outside of the JSON format.
If less than 1 minute remains, set shouldContinue to false to allow time for final synthesis.
If I have enough information, set shouldContinue to false.

Respond in this exact JSON format:
{{
  "analysis": {{
    "summary": "summary of findings",
    "gaps": ["gap1", "gap2"],
    "nextSteps": ["step1", "step2"],
    "shouldContinue": true/false,
    "nextSearchTopic": "optional topic",
    "urlToSearch": "optional url"
  }}
}}"#,
        minutes = remaining_minutes(remaining),
        findings = render_findings(findings),
    )
}

/// Prompt for the final synthesis call.
pub fn synthesis(topic: &str, findings: &[Finding], summaries: &[String]) -> String {
    format!(
        "Create a comprehensive long analysis of {topic} based on these findings:\n\
         {findings}\n\
         {summaries}\n\
         Provide all the thoughts processes including findings details, key insights, conclusions, \
         and any remaining uncertainties. Include citations to sources where appropriate. \
         This analysis should be very comprehensive and full of details. \
         It is expected to be very long, detailed and comprehensive.",
        findings = render_findings(findings),
        summaries = render_summaries(summaries),
    )
}

pub fn render_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(Finding::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_summaries(summaries: &[String]) -> String {
    summaries
        .iter()
        .map(|s| format!("[Summary]: {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Minutes left, rounded to one decimal place.
fn remaining_minutes(remaining: Duration) -> f64 {
    (remaining.as_secs_f64() / 60.0 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_minutes_rounding() {
        assert_eq!(remaining_minutes(Duration::from_secs(90)), 1.5);
        assert_eq!(remaining_minutes(Duration::from_secs(62)), 1.0);
        assert_eq!(remaining_minutes(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_synthesis_embeds_findings_and_summaries() {
        let findings = vec![
            Finding::new("Caffeine delays sleep onset", "https://a.example"),
            Finding::new("Anxiety is a common cause", "https://b.example"),
        ];
        let summaries = vec!["first pass".to_string(), String::new()];

        let prompt = synthesis("insomnia", &findings, &summaries);

        assert!(prompt.starts_with("Create a comprehensive long analysis of insomnia"));
        assert!(prompt.contains(
            "[From https://a.example]: Caffeine delays sleep onset\n\
             [From https://b.example]: Anxiety is a common cause"
        ));
        assert!(prompt.contains("[Summary]: first pass\n[Summary]: \n"));
    }

    #[test]
    fn test_analysis_prompt_mentions_budget_and_format() {
        let prompt = analysis("insomnia", &[], Duration::from_secs(45));

        assert!(prompt.contains("analyzing findings about: insomnia"));
        assert!(prompt.contains("You have 0.8 minutes remaining"));
        assert!(prompt.contains("\"shouldContinue\": true/false"));
    }

    #[test]
    fn test_extraction_prompt_names_topic() {
        assert!(extraction("sleep apnea").starts_with("Extract key information about sleep apnea."));
    }
}
