use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::profiles::{Profile, ProfileDraft, ProfileId, is_valid, normalize_at};

/// Inserting an existing key replaces its value but keeps its position.
#[derive(Clone, Debug)]
pub struct OrderedMap<K, V> {
    order: Vec<K>,
    values: HashMap<K, V>,
}

impl<K, V> OrderedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_values(self) -> Vec<V> {
        let mut values = self.values;
        self.order
            .into_iter()
            .filter_map(|key| values.remove(&key))
            .collect()
    }
}

impl<K, V> Default for OrderedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

pub fn merge<I>(incoming: I) -> Vec<Profile>
where
    I: IntoIterator<Item = ProfileDraft>,
{
    merge_at(incoming, Utc::now())
}

pub fn merge_at<I>(incoming: I, now: DateTime<Utc>) -> Vec<Profile>
where
    I: IntoIterator<Item = ProfileDraft>,
{
    let profiles = incoming
        .into_iter()
        .enumerate()
        .filter_map(|(index, draft)| {
            let Some(kind) = draft.kind else {
                tracing::debug!(index, "dropping record without a recognized kind");
                return None;
            };
            if draft.host.trim().is_empty() {
                tracing::debug!(index, %kind, "dropping record with an empty host");
                return None;
            }
            Some(normalize_at(&draft, kind, now))
        });
    collect_unique(profiles)
}

fn collect_unique(profiles: impl IntoIterator<Item = Profile>) -> Vec<Profile> {
    let mut by_key = OrderedMap::new();
    for profile in profiles {
        if let Some(previous) = by_key.insert(profile.identity_key(), profile) {
            tracing::debug!(id = %previous.id, "record superseded by a later duplicate");
        }
    }

    let mut profiles = by_key.into_values();
    let mut seen = HashSet::new();
    for profile in &mut profiles {
        if !seen.insert(profile.id.clone()) {
            let fresh = ProfileId::new();
            tracing::warn!(old = %profile.id, new = %fresh, "reassigning duplicated profile id");
            profile.id = fresh;
            seen.insert(profile.id.clone());
        }
    }
    profiles
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    profiles: Vec<Profile>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: collect_unique(profiles),
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn into_profiles(self) -> Vec<Profile> {
        self.profiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Profile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|profile| &profile.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Profile> {
        let name = name.trim();
        self.profiles
            .iter()
            .find(|profile| profile.name.eq_ignore_ascii_case(name))
    }

    pub fn upsert(&mut self, draft: &ProfileDraft) -> Option<Profile> {
        self.upsert_at(draft, Utc::now())
    }

    /// Matches by draft id, then by identity key. `None` when the draft is
    /// invalid.
    pub fn upsert_at(&mut self, draft: &ProfileDraft, now: DateTime<Utc>) -> Option<Profile> {
        let Some(kind) = draft.kind else {
            tracing::debug!("ignoring draft without a recognized kind");
            return None;
        };
        let mut profile = normalize_at(draft, kind, now);
        if !is_valid(&profile) {
            tracing::debug!(name = %profile.name, host = %profile.host, "ignoring invalid draft");
            return None;
        }

        let key = profile.identity_key();
        let matched = draft
            .id
            .as_ref()
            .and_then(|id| self.position(id))
            .or_else(|| {
                self.profiles
                    .iter()
                    .position(|existing| existing.identity_key() == key)
            });

        match matched {
            Some(index) => {
                let existing = &self.profiles[index];
                profile.id = existing.id.clone();
                profile.created_at = existing.created_at;
                profile.updated_at = advance(existing.updated_at, now);
                tracing::debug!(id = %profile.id, %key, "updating profile");
                self.profiles[index] = profile.clone();
            }
            None => {
                profile.updated_at = now;
                tracing::debug!(id = %profile.id, %key, "adding profile");
                self.profiles.insert(0, profile.clone());
            }
        }

        let id = &profile.id;
        self.profiles
            .retain(|existing| &existing.id == id || existing.identity_key() != key);
        Some(profile)
    }

    pub fn replace_all(&mut self, incoming: impl IntoIterator<Item = ProfileDraft>) {
        self.profiles = merge(incoming);
    }

    pub fn remove(&mut self, id: &ProfileId) -> Option<Profile> {
        let index = self.position(id)?;
        Some(self.profiles.remove(index))
    }

    pub fn search(&self, query: &str, letter: Option<char>) -> Vec<&Profile> {
        let query = query.trim().to_lowercase();
        let letter = letter.map(|letter| letter.to_lowercase().collect::<String>());
        self.profiles
            .iter()
            .filter(|profile| {
                query.is_empty()
                    || profile.name.to_lowercase().contains(&query)
                    || profile.host.to_lowercase().contains(&query)
            })
            .filter(|profile| match &letter {
                Some(letter) => profile.name.trim().to_lowercase().starts_with(letter.as_str()),
                None => true,
            })
            .collect()
    }

    fn position(&self, id: &ProfileId) -> Option<usize> {
        self.profiles.iter().position(|profile| &profile.id == id)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Profile;
    type IntoIter = std::slice::Iter<'a, Profile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}
