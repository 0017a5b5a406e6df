// src/checker/fallback.rs
// =============================================================================
// Third-party "is this URL reachable" services.
//
// Used only for links that neither the direct nor the proxied GET could
// reach. Each service is asked about one link at a time; the orchestrator
// makes sure calls are sequential and spaced out.
//
// Response shapes we understand (field names are configurable):
//   status field:  {"status": 301, ...}
//   code + data:   {"code": 200, "data": 301, ...}
//
// Anything else (transport error, the service's own status not 200, a body
// that is not JSON, missing or non-numeric fields) means "this service could
// not tell us", and the link moves on.
// =============================================================================

use std::time::{Duration, Instant};

use log::{info, warn};
use reqwest::Client;
use serde_json::Value;

use super::http::{get_with_retry, is_success_status};
use crate::config::{ApiShape, FallbackApi};
use crate::error::AttemptError;
use crate::pipeline::outcome::{
    round_latency, CheckLayer, Escalation, Resolution, StageOutcome,
};

#[derive(Clone)]
pub struct ApiChecker {
    layer: CheckLayer,
    api: FallbackApi,
    client: Client,
    retry_delay: Duration,
}

impl ApiChecker {
    pub fn new(layer: CheckLayer, api: FallbackApi, client: Client, retry_delay: Duration) -> Self {
        ApiChecker {
            layer,
            api,
            client,
            retry_delay,
        }
    }

    pub fn layer(&self) -> CheckLayer {
        self.layer
    }

    // Asks the service about `link`
    //
    // Returns Resolved(api1|api2) when the service reports a success status
    // for the target, otherwise Escalate with the accumulated latency.
    pub async fn check(&self, link: &str, prior: &Escalation) -> StageOutcome {
        let started = Instant::now();
        let result = self.query(link).await;
        let latency = round_latency(prior.latency + started.elapsed().as_secs_f64());

        match result {
            Ok(target_status) if is_success_status(target_status) => {
                info!(
                    "[{}] {} reported reachable (target HTTP {})",
                    self.layer, link, target_status
                );
                StageOutcome::Resolved(Resolution {
                    layer: self.layer,
                    status: target_status,
                    latency,
                })
            }
            Ok(target_status) => {
                warn!(
                    "[{}] {} reported target HTTP {}",
                    self.layer, link, target_status
                );
                StageOutcome::Escalate(Escalation {
                    reason: format!("{} reported target status {}", self.layer, target_status),
                    latency,
                    last_status: target_status,
                })
            }
            Err(e) => {
                warn!("[{}] could not check {}: {}", self.layer, link, e);
                StageOutcome::Escalate(Escalation {
                    reason: format!("{} failed: {}", self.layer, e),
                    latency,
                    last_status: prior.last_status,
                })
            }
        }
    }

    async fn query(&self, link: &str) -> Result<i64, AttemptError> {
        let query = [(self.api.query_param.as_str(), link)];
        let response =
            get_with_retry(&self.client, &self.api.endpoint, &query, self.retry_delay).await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(AttemptError::Status(status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AttemptError::Decode(e.to_string()))?;

        decode_target_status(&self.api.shape, &body)
    }
}

// Pulls the target's status code out of a service response
pub fn decode_target_status(shape: &ApiShape, body: &Value) -> Result<i64, AttemptError> {
    match shape {
        ApiShape::StatusField { field } => numeric_field(body, field),
        ApiShape::CodeData {
            code_field,
            data_field,
        } => {
            let code = numeric_field(body, code_field)?;
            if code != 200 {
                return Err(AttemptError::Decode(format!(
                    "service answered {} = {}",
                    code_field, code
                )));
            }
            numeric_field(body, data_field)
        }
    }
}

// Services are not consistent about numbers vs numeric strings
fn numeric_field(body: &Value, field: &str) -> Result<i64, AttemptError> {
    let value = body
        .get(field)
        .ok_or_else(|| AttemptError::Decode(format!("missing field `{}`", field)))?;

    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| AttemptError::Decode(format!("field `{}` is not a number: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_shape() -> ApiShape {
        FallbackApi::status_field("https://api.example/status").shape
    }

    fn code_data_shape() -> ApiShape {
        FallbackApi::code_data("https://api.example/check").shape
    }

    #[test]
    fn test_status_field_number_and_string() {
        assert_eq!(decode_target_status(&status_shape(), &json!({"status": 301})).unwrap(), 301);
        assert_eq!(decode_target_status(&status_shape(), &json!({"status": "200"})).unwrap(), 200);
    }

    #[test]
    fn test_status_field_missing_or_garbage() {
        assert!(decode_target_status(&status_shape(), &json!({"msg": "ok"})).is_err());
        assert!(decode_target_status(&status_shape(), &json!({"status": "up"})).is_err());
        assert!(decode_target_status(&status_shape(), &json!({"status": null})).is_err());
    }

    #[test]
    fn test_code_data_requires_service_success() {
        let shape = code_data_shape();
        assert_eq!(decode_target_status(&shape, &json!({"code": 200, "data": 302})).unwrap(), 302);
        assert_eq!(decode_target_status(&shape, &json!({"code": 200, "data": 404})).unwrap(), 404);
        assert!(decode_target_status(&shape, &json!({"code": 500, "data": 200})).is_err());
        assert!(decode_target_status(&shape, &json!({"code": 200})).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_escalates_and_keeps_status() {
        let checker = ApiChecker::new(
            CheckLayer::Api1,
            FallbackApi::status_field("http://127.0.0.1:1/status"),
            Client::new(),
            Duration::ZERO,
        );
        let prior = Escalation {
            reason: "probe failed".to_string(),
            latency: 1.0,
            last_status: 500,
        };
        match checker.check("https://a.example/", &prior).await {
            StageOutcome::Escalate(escalation) => {
                assert_eq!(escalation.last_status, 500);
                assert!(escalation.latency >= 1.0);
            }
            other => panic!("expected escalation, got {:?}", other),
        }
    }
}
