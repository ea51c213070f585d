//! Machine registry page

use tracing::info;

use super::PageResult;
use crate::cache::keys;
use crate::model::{Machine, MachineForm, MachinePatch, MachineType};
use crate::state::AppState;
use crate::validation::Validate;

pub async fn list(state: &AppState) -> PageResult<Vec<Machine>> {
    let portal = &state.portal;
    Ok(state.cache.fetch(keys::machines(), move || portal.list_machines()).await?)
}

pub async fn get(state: &AppState, id: i64) -> PageResult<Machine> {
    let portal = &state.portal;
    Ok(state.cache.fetch(keys::machine(id), move || portal.get_machine(id)).await?)
}

pub async fn create(state: &AppState, form: &MachineForm) -> PageResult<()> {
    form.validate()?;
    state.portal.create_machine(form).await?;
    state.cache.invalidate(&keys::machines()).await;
    info!(name = %form.name, "Machine registered");
    Ok(())
}

pub async fn update(state: &AppState, id: i64, patch: &MachinePatch) -> PageResult<()> {
    patch.validate()?;
    state.portal.update_machine(id, patch).await?;
    // Also drops the single-machine entry, which shares the prefix.
    state.cache.invalidate(&keys::machines()).await;
    info!(machine_id = id, "Machine updated");
    Ok(())
}

pub async fn delete(state: &AppState, id: i64) -> PageResult<()> {
    state.portal.delete_machine(id).await?;
    state.cache.invalidate(&keys::machines()).await;
    info!(machine_id = id, "Machine deleted");
    Ok(())
}

/// Choices for the machine type selector
pub fn machine_types() -> Vec<&'static str> {
    MachineType::ALL.iter().map(MachineType::as_str).collect()
}
