use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use rally_types::config::{EconomyFile, FeedbackDef};

use crate::error::ConfigError;
use crate::rank::ThresholdTable;

/// A points reason keyed by its emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionReason {
    pub emoji: String,
    pub text: String,
    pub delta: i64,
}

/// Validated, immutable economy settings shared by every handler.
#[derive(Debug, Clone)]
pub struct EconomyConfig {
    reasons: Vec<ReactionReason>,
    pub thresholds: ThresholdTable,
    pub feedback: FeedbackDef,
    pub resolution_emoji: String,
}

impl EconomyConfig {
    pub fn from_file(file: EconomyFile) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for reason in &file.reasons {
            if !seen.insert(reason.emoji.as_str()) {
                return Err(ConfigError::DuplicateReason(reason.emoji.clone()));
            }
        }

        // Workflow triggers must be disjoint from the points table
        for trigger in [
            &file.resolution_emoji,
            &file.feedback.positive_emoji,
            &file.feedback.negative_emoji,
        ] {
            if seen.contains(trigger.as_str()) {
                return Err(ConfigError::OverlappingTrigger(trigger.clone()));
            }
        }

        let reasons = file
            .reasons
            .into_iter()
            .map(|r| ReactionReason {
                emoji: r.emoji,
                text: r.text,
                delta: r.points,
            })
            .collect();

        Ok(Self {
            reasons,
            thresholds: ThresholdTable::new(file.tiers)?,
            feedback: file.feedback,
            resolution_emoji: file.resolution_emoji,
        })
    }

    /// Read a JSON economy file, or use the built-in tables when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
                let file: EconomyFile = serde_json::from_str(&raw)
                    .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
                info!("Loaded economy config from {}", path.display());
                file
            }
            None => {
                info!("No economy config given, using built-in tables");
                EconomyFile::default()
            }
        };
        Self::from_file(file)
    }

    pub fn reason(&self, emoji: &str) -> Option<&ReactionReason> {
        self.reasons.iter().find(|r| r.emoji == emoji)
    }

    pub fn reasons(&self) -> &[ReactionReason] {
        &self.reasons
    }
}
