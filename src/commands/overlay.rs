use serde::Serialize;
use tracing::{info, warn};

use super::{CommandOutcome, DistributionCommands};
use crate::domain::{Overlay, OverlayKind};
use crate::error::DistributionError;

/// Longest intro/outro accepted, in seconds.
pub const MAX_OVERLAY_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AddOverlayCommand {
    pub item_id: String,
    /// `intro` or `outro`.
    pub overlay_type: String,
    pub asset_path: String,
    pub duration_seconds: f64,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

impl DistributionCommands {
    /// Attach an intro or outro to an item that can still be published.
    pub fn add_overlay(
        &self,
        cmd: AddOverlayCommand,
    ) -> Result<CommandOutcome<Overlay>, DistributionError> {
        self.idempotent(
            "add_overlay",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |record| match &record.response_payload {
                Some(bytes) => Ok(bitcode::deserialize::<Overlay>(bytes)?),
                None => Err(DistributionError::Serialization(format!(
                    "idempotency record {} has no cached overlay",
                    record.key
                ))),
            },
            || {
                let overlay = self.attach_overlay(&cmd)?;
                let payload = bitcode::serialize(&overlay)?;
                Ok((overlay, Some(payload)))
            },
        )
    }

    fn attach_overlay(&self, cmd: &AddOverlayCommand) -> Result<Overlay, DistributionError> {
        let item = self.load(&cmd.item_id)?;
        if item.status.is_terminal() {
            warn!(
                event = "distribution_overlay_terminal_item",
                item_id = %item.id,
                status = %item.status,
                "overlay rejected"
            );
            return Err(DistributionError::TerminalState {
                item_id: item.id,
                status: item.status,
            });
        }

        let overlay_type = OverlayKind::parse(&cmd.overlay_type)?;
        let asset_path = cmd.asset_path.trim();
        if asset_path.is_empty() {
            return Err(DistributionError::InvalidInput("asset_path is required".into()));
        }
        if !(cmd.duration_seconds > 0.0 && cmd.duration_seconds <= MAX_OVERLAY_SECONDS) {
            return Err(DistributionError::InvalidInput(format!(
                "overlay duration must be in (0, {MAX_OVERLAY_SECONDS}] seconds, got {}",
                cmd.duration_seconds
            )));
        }

        let overlay = Overlay {
            id: self.ids.new_id(),
            distribution_item_id: item.id,
            overlay_type,
            asset_path: asset_path.to_string(),
            duration_seconds: cmd.duration_seconds,
            created_at: self.now(),
        };
        self.repository.add_overlay(overlay.clone())?;

        info!(
            event = "distribution_overlay_added",
            item_id = %overlay.distribution_item_id,
            overlay_id = %overlay.id,
            duration_seconds = overlay.duration_seconds,
            "overlay attached"
        );
        Ok(overlay)
    }
}
