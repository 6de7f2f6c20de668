//! Prompt construction and JSON extraction

use serde::Serialize;

/// Slice from the first `{` to the last `}` in model output
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn render<T: Serialize>(request: &T) -> String {
    serde_json::to_string_pretty(request).unwrap_or_else(|_| "{}".to_string())
}

pub(crate) fn harvest_prompt<T: Serialize>(request: &T) -> String {
    format!(
        r#"You are an agricultural advisor for Telangana farmers.
Given the following data, recommend the optimal harvest window:
{}

Return ONLY a JSON object. No markdown. No explanation. No code blocks.
Schema:
{{
  "recommended_window": "string or null",
  "emergency_sell": boolean,
  "reasoning_telugu": "string in Telugu script",
  "reasoning_english": "string",
  "price_estimate": "string or null"
}}

If viability_days < 3, set emergency_sell: true and recommended_window: null."#,
        render(request)
    )
}

pub(crate) fn yield_prompt<T: Serialize>(request: &T) -> String {
    format!(
        r#"You are an agricultural yield estimator for Telangana.
Given: {}
Return ONLY a JSON object. No markdown. No explanation. No code blocks.
Schema: {{ "estimated_quintals": number, "range_low": number, "range_high": number, "basis": "string" }}"#,
        render(request)
    )
}

pub(crate) fn sell_prompt<T: Serialize>(request: &T) -> String {
    format!(
        r#"You are a sell/wait advisor for Telangana farmers.
Analyze these 7 factors and give a sell/wait recommendation:
{}

Return ONLY a JSON object. No markdown. No explanation. No code blocks.
Schema:
{{
  "decision": "Sell Now" | "Wait X days" | "Emergency: Sell Immediately",
  "wait_days": number | null,
  "factor_breakdown": [
    {{ "factor": string, "status": string, "impact": string }}
  ],
  "reasoning_telugu": "string in Telugu script",
  "reasoning_english": "string"
}}
If viability_days < 3, decision must be "Emergency: Sell Immediately"."#,
        render(request)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fallback::HarvestRequest;

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object("{\"a\": 1}"), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_from_fenced_text() {
        let text = "```json\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_extract_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_prompt_embeds_request() {
        let request = HarvestRequest {
            viability_days: Some(4),
            crop: Some("paddy".to_string()),
            ..Default::default()
        };
        let prompt = harvest_prompt(&request);
        assert!(prompt.contains("\"viability_days\": 4"));
        assert!(prompt.contains("\"crop\": \"paddy\""));
        assert!(!prompt.contains("farmer_count"));
    }
}
