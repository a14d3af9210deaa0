use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Animated preview shown on hover
    pub gif_url: Option<String>,
    pub bio: String,
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub about: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gallery: Vec<String>,
}

impl Character {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRequest {
    pub name: String,
    pub age: u32,
    pub image_url: String,
    #[serde(default)]
    pub gif_url: Option<String>,
    pub bio: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub about: BTreeMap<String, String>,
    #[serde(default)]
    pub gallery: Vec<String>,
}

impl CharacterRequest {
    /// Builds the stored character. Tags are trimmed and de-duplicated,
    /// blank gif urls are dropped.
    pub fn into_character(self, id: Uuid) -> Character {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Character {
            id,
            name: self.name.trim().to_string(),
            age: self.age,
            image_url: self.image_url,
            gif_url: self.gif_url.filter(|url| !url.trim().is_empty()),
            bio: self.bio,
            system_prompt: self.system_prompt,
            tags,
            about: self.about,
            gallery: self.gallery,
        }
    }
}
