//! Form validation for machine and DCP configuration bodies

use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{DcpConfigForm, MachineForm, MachinePatch};

const MACHINE_NAME_MAX_LEN: usize = 100;

/// Field name to message, all failures of one form at once
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Implemented by every body the dashboard forwards upstream
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn check_machine_name(name: &str, errors: &mut ValidationErrors) {
    // UTF-16 code units, as the browser counts them
    let len = name.encode_utf16().count();
    if len == 0 {
        errors.add("name", "name is required");
    } else if len > MACHINE_NAME_MAX_LEN {
        errors.add("name", "name is too long");
    }
}

fn check_machine_type(machine_type: &str, errors: &mut ValidationErrors) {
    if machine_type.is_empty() {
        errors.add("type", "type is required");
    }
}

impl Validate for MachineForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_machine_name(&self.name, &mut errors);
        check_machine_type(&self.machine_type, &mut errors);
        errors.into_result()
    }
}

impl Validate for MachinePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_machine_name(name, &mut errors);
        }
        if let Some(machine_type) = &self.machine_type {
            check_machine_type(machine_type, &mut errors);
        }
        errors.into_result()
    }
}

impl Validate for DcpConfigForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.machine_id < 1 {
            errors.add("machineId", "a machine must be selected");
        }
        if self.collect_interval < 1 {
            errors.add("collectInterval", "collection interval must be at least 1 second");
        }
        if Url::parse(&self.api_endpoint).is_err() {
            errors.add("apiEndpoint", "invalid URL");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(name: &str, machine_type: &str) -> MachineForm {
        MachineForm {
            name: name.to_string(),
            machine_type: machine_type.to_string(),
        }
    }

    fn dcp(machine_id: i64, collect_interval: i64, api_endpoint: &str) -> DcpConfigForm {
        DcpConfigForm {
            machine_id,
            collect_interval,
            api_endpoint: api_endpoint.to_string(),
        }
    }

    #[test]
    fn test_valid_machine() {
        assert!(machine("CNC-01", "HIGH").validate().is_ok());
    }

    #[test]
    fn test_machine_reports_every_field() {
        let errors = machine("", "").validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["name", "type"]);
        assert_eq!(errors.get("name"), Some("name is required"));
    }

    #[test]
    fn test_machine_name_length_counts_characters() {
        assert!(machine(&"가".repeat(100), "LOW").validate().is_ok());
        let errors = machine(&"a".repeat(101), "LOW").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("name is too long"));
    }

    #[test]
    fn test_machine_name_length_counts_utf16_units() {
        // Each emoji is a surrogate pair
        assert!(machine(&"🔧".repeat(50), "LOW").validate().is_ok());
        let errors = machine(&"🔧".repeat(51), "LOW").validate().unwrap_err();
        assert_eq!(errors.get("name"), Some("name is too long"));
    }

    #[test]
    fn test_machine_patch_checks_present_fields_only() {
        assert!(MachinePatch::default().validate().is_ok());

        let patch = MachinePatch {
            name: Some(String::new()),
            machine_type: None,
        };
        let errors = patch.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn test_valid_dcp_config() {
        assert!(dcp(1, 10, "http://plc-01.local:9000/metrics").validate().is_ok());
    }

    #[test]
    fn test_dcp_config_bounds() {
        let errors = dcp(0, 0, "http://x.io").validate().unwrap_err();
        assert!(errors.get("machineId").is_some());
        assert!(errors.get("collectInterval").is_some());
        assert!(errors.get("apiEndpoint").is_none());
    }

    #[test]
    fn test_dcp_config_rejects_relative_endpoint() {
        for endpoint in ["", "/api/data", "not a url"] {
            let errors = dcp(1, 1, endpoint).validate().unwrap_err();
            assert_eq!(errors.get("apiEndpoint"), Some("invalid URL"), "{endpoint}");
        }
    }

    #[test]
    fn test_dcp_config_accepts_any_absolute_url() {
        for endpoint in ["mailto:ops@example.com", "opc.tcp://plc-02:4840", "https://collector.io/x"] {
            assert!(dcp(1, 1, endpoint).validate().is_ok(), "{endpoint}");
        }
    }

    #[test]
    fn test_display_joins_fields() {
        let errors = machine("", "").validate().unwrap_err();
        assert_eq!(errors.to_string(), "name: name is required; type: type is required");
    }
}
