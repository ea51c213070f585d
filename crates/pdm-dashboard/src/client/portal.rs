use reqwest::Method;
use std::time::Duration;

use super::{ClientResult, HttpClient};
use crate::model::{DcpConfig, DcpConfigForm, Machine, MachineForm, MachinePatch, SensorReading};

const SERVICE: &str = "portal";

/// Client for the portal backend API
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: HttpClient,
}

impl PortalClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub async fn list_machines(&self) -> ClientResult<Vec<Machine>> {
        self.http.get_json("/api/machine", &[]).await
    }

    pub async fn get_machine(&self, id: i64) -> ClientResult<Machine> {
        self.http.get_json(&format!("/api/machine/{id}"), &[]).await
    }

    pub async fn create_machine(&self, form: &MachineForm) -> ClientResult<()> {
        self.http.send_json(Method::POST, "/api/machine", Some(form)).await
    }

    pub async fn update_machine(&self, id: i64, patch: &MachinePatch) -> ClientResult<()> {
        self.http
            .send_json(Method::PUT, &format!("/api/machine/{id}"), Some(patch))
            .await
    }

    pub async fn delete_machine(&self, id: i64) -> ClientResult<()> {
        self.http
            .send_json::<()>(Method::DELETE, &format!("/api/machine/{id}"), None)
            .await
    }

    pub async fn list_dcp_configs(&self) -> ClientResult<Vec<DcpConfig>> {
        self.http.get_json("/api/dcp-config", &[]).await
    }

    pub async fn get_dcp_config(&self, id: i64) -> ClientResult<DcpConfig> {
        self.http.get_json(&format!("/api/dcp-config/{id}"), &[]).await
    }

    pub async fn create_dcp_config(&self, form: &DcpConfigForm) -> ClientResult<()> {
        self.http.send_json(Method::POST, "/api/dcp-config", Some(form)).await
    }

    pub async fn update_dcp_config(&self, id: i64, form: &DcpConfigForm) -> ClientResult<()> {
        self.http
            .send_json(Method::PUT, &format!("/api/dcp-config/{id}"), Some(form))
            .await
    }

    pub async fn delete_dcp_config(&self, id: i64) -> ClientResult<()> {
        self.http
            .send_json::<()>(Method::DELETE, &format!("/api/dcp-config/{id}"), None)
            .await
    }

    /// Readings of one machine between two local date-times (inclusive)
    pub async fn sensor_data(
        &self,
        machine_id: i64,
        start: &str,
        end: &str,
    ) -> ClientResult<Vec<SensorReading>> {
        self.http
            .get_json(
                &format!("/api/machine-sensor-data/{machine_id}"),
                &[("startDateTime", start), ("endDateTime", end)],
            )
            .await
    }
}
