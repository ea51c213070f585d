use std::time::Duration;

use super::{ClientResult, HttpClient};
use crate::model::AnomalyHistory;

const SERVICE: &str = "ai-service";

/// Client for the inference service's anomaly history API
#[derive(Debug, Clone)]
pub struct AiClient {
    http: HttpClient,
}

impl AiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub async fn anomaly_histories(&self) -> ClientResult<Vec<AnomalyHistory>> {
        self.http.get_json("/anomaly-histories", &[]).await
    }

    /// Anomalies detected between two local date-times.
    ///
    /// The range is sent under both the `start`/`end` and the
    /// `start_date`/`end_date` parameter names the service versions accept.
    pub async fn search_anomaly_histories(
        &self,
        start: &str,
        end: &str,
    ) -> ClientResult<Vec<AnomalyHistory>> {
        self.http
            .get_json(
                "/anomaly-histories/search",
                &[
                    ("start", start),
                    ("end", end),
                    ("start_date", start),
                    ("end_date", end),
                ],
            )
            .await
    }

    pub async fn machine_anomaly_histories(&self, machine_id: i64) -> ClientResult<Vec<AnomalyHistory>> {
        self.http
            .get_json(&format!("/anomaly-histories/machine/{machine_id}"), &[])
            .await
    }
}
