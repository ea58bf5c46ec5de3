use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DistributionError;

/// Social platforms an item can be distributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    TikTok,
    Instagram,
    YouTube,
    Snapchat,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::TikTok,
        Platform::Instagram,
        Platform::YouTube,
        Platform::Snapchat,
    ];

    /// Parse a user-supplied platform name (trimmed, case-insensitive).
    pub fn parse(value: &str) -> Result<Platform, DistributionError> {
        match value.trim().to_lowercase().as_str() {
            "tiktok" => Ok(Platform::TikTok),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::YouTube),
            "snapchat" => Ok(Platform::Snapchat),
            _ => Err(DistributionError::UnsupportedPlatform(value.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::Snapchat => "snapchat",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse, deduplicate (first occurrence wins) and require at least one platform.
pub fn normalize_platforms<S: AsRef<str>>(
    values: &[S],
) -> Result<Vec<Platform>, DistributionError> {
    let mut platforms = Vec::with_capacity(values.len());
    for value in values {
        let platform = Platform::parse(value.as_ref())?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    if platforms.is_empty() {
        return Err(DistributionError::InvalidInput(
            "at least one platform is required".into(),
        ));
    }
    Ok(platforms)
}
