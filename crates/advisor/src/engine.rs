//! Advisor Engine

use chrono::NaiveDate;
use fallback::{
    FallbackEngine, HarvestAdvice, HarvestRequest, SellAdvice, SellRequest, YieldEstimate,
    YieldRequest,
};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{AdvisorConfig, GeminiClient};
use crate::prompt::{extract_json_object, harvest_prompt, sell_prompt, yield_prompt};
use crate::AdvisorError;

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceSource {
    /// Deterministic answer in mock mode
    Mock,
    /// Parsed from the generative service
    Live,
    /// Safe default after a failed live call
    Fallback,
}

impl AdviceSource {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceSource::Mock => "mock",
            AdviceSource::Live => "live",
            AdviceSource::Fallback => "fallback",
        }
    }
}

/// Result of one advisory call
#[derive(Debug, Clone)]
pub struct Advice<T> {
    /// The answer returned to the caller
    pub body: T,
    /// Where it came from
    pub source: AdviceSource,
    /// Wall-clock latency in milliseconds
    pub latency_ms: u64,
}

enum Mode {
    Mock,
    Live(GeminiClient),
}

/// Advisor answering from the generative service or the fallback rules
pub struct Advisor {
    mode: Mode,
    fallback: FallbackEngine,
}

impl Advisor {
    /// Create an advisor from configuration
    pub fn new(config: &AdvisorConfig, fallback: FallbackEngine) -> Result<Self, AdvisorError> {
        let mode = if config.mock {
            info!("Advisor running in mock mode");
            Mode::Mock
        } else {
            let client = GeminiClient::new(config)?;
            if !client.has_credential() {
                warn!("Advisor in live mode without an API key; every call will fall back");
            }
            Mode::Live(client)
        };

        Ok(Self { mode, fallback })
    }

    /// Create a mock advisor
    pub fn mock(fallback: FallbackEngine) -> Self {
        Self {
            mode: Mode::Mock,
            fallback,
        }
    }

    /// Whether the advisor answers without calling out
    pub fn is_mock(&self) -> bool {
        matches!(self.mode, Mode::Mock)
    }

    /// Get the fallback engine
    pub fn fallback(&self) -> &FallbackEngine {
        &self.fallback
    }

    /// Harvest-window recommendation
    pub async fn harvest(&self, request: &HarvestRequest, today: NaiveDate) -> Advice<HarvestAdvice> {
        let start = Instant::now();
        let (body, source) = match &self.mode {
            Mode::Mock => (self.fallback.harvest(request, today), AdviceSource::Mock),
            Mode::Live(client) => {
                match self.ask::<HarvestAdvice>(client, &harvest_prompt(request)).await {
                    Ok(advice) => (self.fallback.enforce_harvest(request, advice), AdviceSource::Live),
                    Err(e) => {
                        warn!("Harvest advisor failed, using safe default: {}", e);
                        (self.fallback.harvest_safe_default(request), AdviceSource::Fallback)
                    }
                }
            }
        };

        Self::finish(body, source, start)
    }

    /// Sell/wait recommendation
    pub async fn sell(&self, request: &SellRequest) -> Advice<SellAdvice> {
        let start = Instant::now();
        let (body, source) = match &self.mode {
            Mode::Mock => (self.fallback.sell(request), AdviceSource::Mock),
            Mode::Live(client) => match self.ask::<SellAdvice>(client, &sell_prompt(request)).await {
                Ok(advice) => (self.fallback.enforce_sell(request, advice), AdviceSource::Live),
                Err(e) => {
                    warn!("Sell advisor failed, using safe default: {}", e);
                    (self.fallback.sell_safe_default(request), AdviceSource::Fallback)
                }
            },
        };

        Self::finish(body, source, start)
    }

    /// Yield estimate
    pub async fn estimate_yield(&self, request: &YieldRequest) -> Advice<YieldEstimate> {
        let start = Instant::now();
        let (body, source) = match &self.mode {
            Mode::Mock => (self.fallback.estimate_yield(request), AdviceSource::Mock),
            Mode::Live(client) => {
                let answer = self
                    .ask::<YieldEstimate>(client, &yield_prompt(request))
                    .await
                    .and_then(|estimate| {
                        if estimate.is_consistent() {
                            Ok(estimate)
                        } else {
                            Err(AdvisorError::InvalidResponse(format!(
                                "estimate {} outside range {}-{}",
                                estimate.estimated_quintals, estimate.range_low, estimate.range_high
                            )))
                        }
                    });
                match answer {
                    Ok(estimate) => (estimate, AdviceSource::Live),
                    Err(e) => {
                        warn!("Yield advisor failed, using safe default: {}", e);
                        (self.fallback.yield_safe_default(), AdviceSource::Fallback)
                    }
                }
            }
        };

        Self::finish(body, source, start)
    }

    async fn ask<T: DeserializeOwned>(&self, client: &GeminiClient, prompt: &str) -> Result<T, AdvisorError> {
        let text = client.generate(prompt).await?;
        let json = extract_json_object(&text)
            .ok_or_else(|| AdvisorError::InvalidResponse("No JSON object in model output".to_string()))?;

        serde_json::from_str(json).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))
    }

    fn finish<T>(body: T, source: AdviceSource, start: Instant) -> Advice<T> {
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!("Advice from {} in {}ms", source.as_str(), latency_ms);
        Advice {
            body,
            source,
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 11).unwrap()
    }

    async fn live_advisor(server: &MockServer) -> Advisor {
        let config = AdvisorConfig {
            mock: false,
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            timeout_ms: 300,
            ..Default::default()
        };
        Advisor::new(&config, FallbackEngine::default()).unwrap()
    }

    async fn respond_with_text(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [ { "content": { "parts": [ { "text": text } ] } } ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_mock_harvest_emergency() {
        let advisor = Advisor::mock(FallbackEngine::default());
        let request = HarvestRequest {
            viability_days: Some(2),
            ..Default::default()
        };

        let advice = advisor.harvest(&request, today()).await;
        assert_eq!(advice.source, AdviceSource::Mock);
        assert!(advice.body.emergency_sell);
        assert_eq!(advice.body.recommended_window, None);
    }

    #[tokio::test]
    async fn test_mock_yield() {
        let advisor = Advisor::mock(FallbackEngine::default());
        let request = YieldRequest {
            field_size_acres: Some(5.0),
            ..Default::default()
        };

        let advice = advisor.estimate_yield(&request).await;
        assert_eq!(advice.body.estimated_quintals, 90);
        assert_eq!(advice.body.range_low, 76);
        assert_eq!(advice.body.range_high, 104);
    }

    #[tokio::test]
    async fn test_live_yield_parsed_from_fenced_json() {
        let server = MockServer::start().await;
        respond_with_text(
            &server,
            "```json\n{\"estimated_quintals\": 120, \"range_low\": 100, \"range_high\": 140, \"basis\": \"model\"}\n```",
        )
        .await;

        let advice = live_advisor(&server).await.estimate_yield(&YieldRequest::default()).await;
        assert_eq!(advice.source, AdviceSource::Live);
        assert_eq!(advice.body.estimated_quintals, 120);
        assert_eq!(advice.body.basis, "model");
    }

    #[tokio::test]
    async fn test_live_inverted_yield_range_falls_back() {
        let server = MockServer::start().await;
        respond_with_text(
            &server,
            r#"{"estimated_quintals": 90, "range_low": 120, "range_high": 60, "basis": "model"}"#,
        )
        .await;

        let advice = live_advisor(&server).await.estimate_yield(&YieldRequest::default()).await;
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.body, FallbackEngine::default().yield_safe_default());
        assert!(advice.body.is_consistent());
    }

    #[tokio::test]
    async fn test_live_non_json_falls_back() {
        let server = MockServer::start().await;
        respond_with_text(&server, "I think you should harvest soon.").await;

        let advice = live_advisor(&server).await.estimate_yield(&YieldRequest::default()).await;
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.body, FallbackEngine::default().yield_safe_default());
    }

    #[tokio::test]
    async fn test_live_sell_emergency_enforced() {
        let server = MockServer::start().await;
        respond_with_text(
            &server,
            r#"{"decision": "Sell Now", "wait_days": null, "factor_breakdown": [], "reasoning_telugu": "", "reasoning_english": "Sell"}"#,
        )
        .await;

        let request = SellRequest {
            viability_days: Some(1),
            ..Default::default()
        };
        let advice = live_advisor(&server).await.sell(&request).await;
        assert_eq!(advice.source, AdviceSource::Live);
        assert_eq!(advice.body.decision, "Emergency: Sell Immediately");
    }

    #[tokio::test]
    async fn test_live_timeout_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
            .mount(&server)
            .await;

        let request = HarvestRequest {
            viability_days: Some(10),
            ..Default::default()
        };
        let advice = live_advisor(&server).await.harvest(&request, today()).await;
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.body.recommended_window.as_deref(), Some("This week"));
        assert!(advice.latency_ms < 3000);
    }

    #[tokio::test]
    async fn test_live_without_key_falls_back() {
        let config = AdvisorConfig {
            mock: false,
            api_key: None,
            ..Default::default()
        };
        let advisor = Advisor::new(&config, FallbackEngine::default()).unwrap();
        assert!(!advisor.is_mock());

        let advice = advisor.sell(&SellRequest::default()).await;
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.body.decision, "Sell Now");
    }
}
