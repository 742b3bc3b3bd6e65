//! Reaction map - emoji to the set of users who reacted with it

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::value_objects::Snowflake;

/// Maximum byte length of an emoji key
pub const MAX_EMOJI_LEN: usize = 64;

/// Emoji -> reacting users
///
/// A missing emoji reads as an empty set, and an emoji whose set empties is
/// removed, so the map never stores an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReactionMap(BTreeMap<String, BTreeSet<Snowflake>>);

impl ReactionMap {
    /// Build from stored `(emoji, user)` rows
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Snowflake)>,
    {
        let mut map = Self::default();
        for (emoji, user_id) in entries {
            map.0.entry(emoji).or_default().insert(user_id);
        }
        map
    }

    /// Flip `user_id`'s reaction with `emoji`
    ///
    /// Returns `true` when the reaction was added, `false` when removed.
    pub fn toggle(&mut self, emoji: &str, user_id: Snowflake) -> bool {
        let users = self.0.entry(emoji.to_string()).or_default();
        let added = users.insert(user_id);
        if !added {
            users.remove(&user_id);
            if users.is_empty() {
                self.0.remove(emoji);
            }
        }
        added
    }

    pub fn users(&self, emoji: &str) -> impl Iterator<Item = Snowflake> + '_ {
        self.0.get(emoji).into_iter().flatten().copied()
    }

    pub fn count(&self, emoji: &str) -> usize {
        self.0.get(emoji).map_or(0, BTreeSet::len)
    }

    pub fn contains(&self, emoji: &str, user_id: Snowflake) -> bool {
        self.0.get(emoji).is_some_and(|users| users.contains(&user_id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct emoji
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Flattened `(emoji, user)` pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, Snowflake)> + '_ {
        self.0
            .iter()
            .flat_map(|(emoji, users)| users.iter().map(move |u| (emoji.as_str(), *u)))
    }
}
