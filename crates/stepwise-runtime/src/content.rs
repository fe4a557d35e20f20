//! Instruction content table.
//!
//! Maps every [`InstructionId`] to the text and image a delivery layer shows
//! the user. The association is data, not logic: the defaults can be
//! overridden per instruction from a TOML file such as
//!
//! ```toml
//! [instructions.cucumber]
//! image = "cucumber.jpeg"
//!
//! [instructions.done]
//! text = "Enjoy your sandwich!"
//! ```
//!
//! Instructions missing from the file, and fields missing from an entry,
//! keep their defaults.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stepwise_types::{GuideError, InstructionId};

/// Text and image shown for one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub text: String,
    /// Image file name, resolved by the delivery layer.
    pub image: String,
}

/// Per-instruction content lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTable {
    entries: HashMap<InstructionId, Content>,
}

#[derive(Deserialize)]
struct ContentFile {
    #[serde(default)]
    instructions: BTreeMap<String, ContentOverride>,
}

#[derive(Deserialize)]
struct ContentOverride {
    text: Option<String>,
    image: Option<String>,
}

impl Default for ContentTable {
    fn default() -> Self {
        let entries = InstructionId::ALL
            .into_iter()
            .map(|id| {
                let (text, image) = default_content(id);
                (
                    id,
                    Content {
                        text: text.to_string(),
                        image: image.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

// The cucumber and too-much-ham warnings reuse the lettuce and tomato
// images, and DONE reuses the full-sandwich image.
fn default_content(id: InstructionId) -> (&'static str, &'static str) {
    match id {
        InstructionId::Bread => ("Now put a piece of bread on the table.", "bread.jpeg"),
        InstructionId::Ham => ("Now put a piece of ham on the bread.", "ham.jpeg"),
        InstructionId::Lettuce => ("Now put a piece of lettuce on the ham.", "lettuce.jpeg"),
        InstructionId::Half => ("Now put a piece of bread on the lettuce.", "half.jpeg"),
        InstructionId::Cucumber => (
            "This sandwich doesn't contain any cucumber. Replace the cucumber with lettuce.",
            "lettuce.jpeg",
        ),
        InstructionId::HamWrong => (
            "That's too much meat. Replace the ham with tomatoes.",
            "tomato.jpeg",
        ),
        InstructionId::Tomato => (
            "You are half done. Now put a piece of tomato on the bread.",
            "tomato.jpeg",
        ),
        InstructionId::Full => (
            "Now put the bread on top and you will be done.",
            "full.jpeg",
        ),
        InstructionId::Done => ("Congratulations! You have made a sandwich!", "full.jpeg"),
    }
}

impl ContentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: InstructionId) -> Option<&Content> {
        self.entries.get(&id)
    }

    pub fn text(&self, id: InstructionId) -> Option<&str> {
        self.get(id).map(|c| c.text.as_str())
    }

    pub fn image(&self, id: InstructionId) -> Option<&str> {
        self.get(id).map(|c| c.image.as_str())
    }

    /// Replace the content for `id`.
    pub fn set(&mut self, id: InstructionId, content: Content) {
        self.entries.insert(id, content);
    }

    /// Parse overrides from TOML on top of the defaults.
    ///
    /// # Errors
    ///
    /// [`GuideError::Config`] for malformed TOML and
    /// [`GuideError::UnknownInstruction`] for a table key that does not name
    /// an instruction.
    pub fn from_toml_str(raw: &str) -> Result<Self, GuideError> {
        let file: ContentFile = toml::from_str(raw)
            .map_err(|e| GuideError::Config(format!("Failed to parse content table: {e}")))?;

        let mut table = Self::default();
        for (key, patch) in file.instructions {
            let id: InstructionId = key.parse()?;
            if let Some(entry) = table.entries.get_mut(&id) {
                if let Some(text) = patch.text {
                    entry.text = text;
                }
                if let Some(image) = patch.image {
                    entry.image = image;
                }
            }
        }
        Ok(table)
    }

    /// Read overrides from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, GuideError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            GuideError::Config(format!(
                "Failed to read content table at {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }
}
