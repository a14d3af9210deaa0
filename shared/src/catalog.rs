use crate::models::Character;
use std::collections::BTreeSet;

/// Every tag used in the catalog, sorted and without duplicates.
pub fn all_tags(characters: &[Character]) -> Vec<String> {
    characters
        .iter()
        .flat_map(|c| c.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn filter_by_tag<'a>(characters: &'a [Character], tag: Option<&str>) -> Vec<&'a Character> {
    match tag {
        None => characters.iter().collect(),
        Some(tag) => characters.iter().filter(|c| c.has_tag(tag)).collect(),
    }
}
