use serde::Serialize;
use tracing::{info, warn};

use super::{CommandOutcome, DistributionCommands};
use crate::domain::DistributionItem;
use crate::error::DistributionError;
use crate::repository::CreateOutcome;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClaimCommand {
    /// Generated when empty.
    pub item_id: Option<String>,
    pub influencer_id: String,
    pub clip_id: String,
    pub campaign_id: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

impl DistributionCommands {
    /// Claim a clip for distribution.
    ///
    /// A claim that collides with an existing item, by id or by
    /// (influencer, clip, campaign), returns the stored item instead of failing.
    pub fn claim(
        &self,
        cmd: ClaimCommand,
    ) -> Result<CommandOutcome<DistributionItem>, DistributionError> {
        self.idempotent(
            "claim",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |record| match &record.response_payload {
                Some(bytes) => Ok(bitcode::deserialize::<DistributionItem>(bytes)?),
                None => Err(DistributionError::Serialization(format!(
                    "idempotency record {} has no cached claim",
                    record.key
                ))),
            },
            || {
                let item = self.claim_item(&cmd)?;
                let payload = bitcode::serialize(&item)?;
                Ok((item, Some(payload)))
            },
        )
    }

    fn claim_item(&self, cmd: &ClaimCommand) -> Result<DistributionItem, DistributionError> {
        let influencer_id = cmd.influencer_id.trim();
        let clip_id = cmd.clip_id.trim();
        let campaign_id = cmd.campaign_id.trim();
        if influencer_id.is_empty() || clip_id.is_empty() || campaign_id.is_empty() {
            warn!(
                event = "distribution_claim_invalid_input",
                influencer_id,
                clip_id,
                campaign_id,
                "claim rejected"
            );
            return Err(DistributionError::InvalidInput(
                "influencer_id, clip_id and campaign_id are required".into(),
            ));
        }

        let item_id = match cmd.item_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.ids.new_id(),
        };
        let now = self.now();
        let item = DistributionItem::claimed(
            item_id,
            influencer_id,
            clip_id,
            campaign_id,
            now,
            now + self.config.claim_ttl,
        );

        match self.repository.create_item(item)? {
            CreateOutcome::Created(item) => {
                info!(
                    event = "distribution_item_claimed",
                    item_id = %item.id,
                    influencer_id = %item.influencer_id,
                    clip_id = %item.clip_id,
                    "distribution item claimed"
                );
                Ok(item)
            }
            CreateOutcome::Existing(item) => {
                warn!(
                    event = "distribution_claim_already_exists",
                    item_id = %item.id,
                    influencer_id = %item.influencer_id,
                    clip_id = %item.clip_id,
                    campaign_id = %item.campaign_id,
                    "claim resolved to the existing item"
                );
                Ok(item)
            }
        }
    }
}
