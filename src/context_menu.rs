use crate::collaborators::{Capability, ContextMenus, Permissions};
use crate::error::{ExtensionError, ExtensionResult};
use crate::state::ExtensionState;

/// Idempotent creation/teardown of the context menu entries
pub struct ContextMenuRegistrar<'a> {
    pub menus: &'a dyn ContextMenus,
    pub permissions: &'a dyn Permissions,
}

impl ContextMenuRegistrar<'_> {
    /// Create the entries unless they already exist.
    ///
    /// Without the permission grant nothing is created, the flag stays false
    /// and `PermissionDenied` is returned.
    pub async fn register(&self, state: &mut ExtensionState) -> ExtensionResult<()> {
        if state.registered_context_menus == Some(true) {
            return Ok(());
        }
        if !self.permissions.has(Capability::ContextMenus).await {
            state.registered_context_menus = Some(false);
            return Err(ExtensionError::PermissionDenied(
                "context menus permission not granted".to_string(),
            ));
        }
        self.menus.create_entries().await?;
        state.registered_context_menus = Some(true);
        log::info!("Context menus registered");
        Ok(())
    }

    pub async fn unregister(&self, state: &mut ExtensionState) -> ExtensionResult<()> {
        if state.registered_context_menus == Some(true) {
            self.menus.remove_all().await?;
            log::info!("Context menus removed");
        }
        state.registered_context_menus = Some(false);
        Ok(())
    }
}
