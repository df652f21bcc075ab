//! Beekeeper contact directory and validation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ContestRules;

/// Errors that can occur while loading or validating the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Contact for sample {sample} is outside the contest range 1..={max_samples}")]
    SampleOutOfRange { sample: u32, max_samples: u32 },

    #[error("Contact for sample {sample} is empty")]
    EmptyContact { sample: u32 },

    #[error("Fallback contact text is empty")]
    EmptyFallback,

    #[error("Failed to read directory file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse directory file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Contact details of the beekeeper behind each honey sample.
///
/// Samples without an entry resolve to the fallback text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeekeeperDirectory {
    /// Contact text keyed by sample number.
    #[serde(default)]
    pub contacts: BTreeMap<u32, String>,

    /// Text shown for samples without a known beekeeper.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    "📞 Контакты по этому мёду уточняйте у организаторов.".to_owned()
}

impl Default for BeekeeperDirectory {
    fn default() -> Self {
        let contacts = BTreeMap::from([
            (
                1,
                "🍯 Иванов И.И.\n🏠 Медовый Рай\n📞 +7(900)123-45-67".to_owned(),
            ),
            (
                2,
                "🍯 Петрова А.С.\n🏠 Золотая Пчела\n📞 +7(900)234-56-78".to_owned(),
            ),
            (
                3,
                "🍯 Сидоров В.П.\n🏠 Лесная Пасека\n📞 +7(900)345-67-89".to_owned(),
            ),
        ]);

        Self {
            contacts,
            fallback: default_fallback(),
        }
    }
}

impl BeekeeperDirectory {
    /// Loads the directory from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)?;
        let directory: Self = serde_json::from_str(&content)?;
        Ok(directory)
    }

    /// Saves the directory to a JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), DirectoryError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks that every entry names a sample of the contest and has text.
    pub fn validate(&self, rules: &ContestRules) -> Result<(), DirectoryError> {
        if self.fallback.trim().is_empty() {
            return Err(DirectoryError::EmptyFallback);
        }

        for (&sample, contact) in &self.contacts {
            if !rules.contains(sample) {
                return Err(DirectoryError::SampleOutOfRange {
                    sample,
                    max_samples: rules.max_samples,
                });
            }
            if contact.trim().is_empty() {
                return Err(DirectoryError::EmptyContact { sample });
            }
        }

        Ok(())
    }

    /// Returns the contact text for a sample, or the fallback.
    #[must_use]
    pub fn lookup(&self, sample: u32) -> &str {
        self.contacts
            .get(&sample)
            .map_or(self.fallback.as_str(), String::as_str)
    }

    /// Returns the number of samples with a known beekeeper.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Checks if no beekeeper is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Creates an example directory for organisers to edit.
    #[must_use]
    pub fn example() -> Self {
        Self::default()
    }
}
