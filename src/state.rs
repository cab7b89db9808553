use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::collaborators::StateStore;
use crate::error::ExtensionResult;

/// Storage key the state record lives under
pub const STATE_STORAGE_KEY: &str = "state";

/// Engine-owned state; every field is unknown until first computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtensionState {
    /// Result of the last automation recalculation
    pub is_enabled: Option<bool>,
    /// Value the last reconciliation acted on; used for edge detection
    pub was_enabled_on_last_check: Option<bool>,
    /// Whether context menu entries currently exist
    pub registered_context_menus: Option<bool>,
}

/// Lazily hydrated [`ExtensionState`]
pub struct StateManager {
    store: Arc<dyn StateStore>,
    state: ExtensionState,
    loaded: bool,
}

impl StateManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            state: ExtensionState::default(),
            loaded: false,
        }
    }

    /// Hydrate from the store on first call; later calls are no-ops
    pub async fn load(&mut self) -> ExtensionResult<()> {
        if self.loaded {
            return Ok(());
        }
        self.state = self.store.load().await?;
        self.loaded = true;
        log::debug!("Extension state loaded: {:?}", self.state);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub async fn save(&self) -> ExtensionResult<()> {
        self.store.save(&self.state).await
    }

    pub fn get(&self) -> &ExtensionState {
        &self.state
    }

    pub fn get_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }
}
