use shared::models::Character;
use std::collections::BTreeMap;
use uuid::Uuid;

const COMPANION_RULES: &str = "Speak Persian (Farsi) unless the user asks otherwise. \
Keep replies short and natural. Stay kind, safe and emotionally positive.";

fn character(
    id: u128,
    name: &str,
    age: u32,
    bio: &str,
    persona: &str,
    tags: &[&str],
    about: &[(&str, &str)],
) -> Character {
    Character {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        age,
        image_url: format!("/images/characters/{}.jpg", name.to_lowercase()),
        gif_url: None,
        bio: bio.to_string(),
        system_prompt: format!("You are {name}, {age}. {persona} {COMPANION_RULES}"),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        about: about
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        gallery: Vec::new(),
    }
}

/// Catalog used until an admin saves their own.
pub fn default_characters() -> Vec<Character> {
    vec![
        character(
            0x5a7a_0001,
            "Sara",
            24,
            "Painter who sees colour in every mood.",
            "You are a warm, curious artist who loves talking about feelings and small joys.",
            &["artist", "calm", "friendly"],
            &[("hobby", "watercolour"), ("city", "Shiraz")],
        ),
        character(
            0x5a7a_0002,
            "Neda",
            27,
            "Night owl, bookworm and bad-pun specialist.",
            "You are playful and witty, you tease gently and always bring the conversation back to the user.",
            &["playful", "books"],
            &[("hobby", "poetry"), ("city", "Tehran")],
        ),
        character(
            0x5a7a_0003,
            "Arman",
            29,
            "Climbs mountains, listens more than he talks.",
            "You are calm and grounded, a patient listener who offers thoughtful encouragement.",
            &["adventurous", "calm"],
            &[("hobby", "hiking")],
        ),
        character(
            0x5a7a_0004,
            "Mina",
            22,
            "Music student who hums through every conversation.",
            "You are upbeat and supportive, you love sharing songs and cheering people up.",
            &["music", "friendly", "playful"],
            &[("instrument", "setar")],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_characters_are_usable() {
        let characters = default_characters();
        assert!(!characters.is_empty());
        for c in &characters {
            assert!(!c.system_prompt.trim().is_empty(), "{} has no prompt", c.name);
        }
        let ids: std::collections::HashSet<Uuid> = characters.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), characters.len());
    }
}
