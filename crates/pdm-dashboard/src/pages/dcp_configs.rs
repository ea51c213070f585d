//! Data-collection configuration page

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::PageResult;
use crate::cache::keys;
use crate::model::{DcpConfig, DcpConfigForm, Machine};
use crate::state::AppState;
use crate::validation::Validate;

/// A configuration as listed, with the name of the machine it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DcpConfigRow {
    #[serde(flatten)]
    pub config: DcpConfig,
    pub machine_name: String,
}

/// Shown when a configuration points at a machine that is unknown or not loaded
pub fn fallback_machine_name(machine_id: i64) -> String {
    format!("Machine #{machine_id}")
}

/// Attach machine names; unknown machines get [`fallback_machine_name`].
pub fn with_machine_names(configs: Vec<DcpConfig>, machines: &[Machine]) -> Vec<DcpConfigRow> {
    let names: HashMap<i64, &str> = machines.iter().map(|m| (m.id, m.name.as_str())).collect();
    configs
        .into_iter()
        .map(|config| {
            let machine_name = names
                .get(&config.machine_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| fallback_machine_name(config.machine_id));
            DcpConfigRow {
                config,
                machine_name,
            }
        })
        .collect()
}

pub(crate) async fn configs(state: &AppState) -> PageResult<Vec<DcpConfig>> {
    let portal = &state.portal;
    Ok(state
        .cache
        .fetch(keys::dcp_configs(), move || portal.list_dcp_configs())
        .await?)
}

/// All configurations. The machine list only decorates the rows, so its
/// failure degrades to fallback names instead of failing the page.
pub async fn list(state: &AppState) -> PageResult<Vec<DcpConfigRow>> {
    let (configs, machines) = tokio::join!(configs(state), super::machines::list(state));
    let machines = machines.unwrap_or_else(|e| {
        warn!("Machine names unavailable for DCP configs: {}", e);
        Vec::new()
    });
    Ok(with_machine_names(configs?, &machines))
}

pub async fn get(state: &AppState, id: i64) -> PageResult<DcpConfig> {
    let portal = &state.portal;
    Ok(state
        .cache
        .fetch(keys::dcp_config(id), move || portal.get_dcp_config(id))
        .await?)
}

pub async fn create(state: &AppState, form: &DcpConfigForm) -> PageResult<()> {
    form.validate()?;
    state.portal.create_dcp_config(form).await?;
    state.cache.invalidate(&keys::dcp_configs()).await;
    info!(machine_id = form.machine_id, "DCP config created");
    Ok(())
}

pub async fn update(state: &AppState, id: i64, form: &DcpConfigForm) -> PageResult<()> {
    form.validate()?;
    state.portal.update_dcp_config(id, form).await?;
    state.cache.invalidate(&keys::dcp_configs()).await;
    info!(config_id = id, "DCP config updated");
    Ok(())
}

pub async fn delete(state: &AppState, id: i64) -> PageResult<()> {
    state.portal.delete_dcp_config(id).await?;
    state.cache.invalidate(&keys::dcp_configs()).await;
    info!(config_id = id, "DCP config deleted");
    Ok(())
}
