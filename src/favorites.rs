// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Favorites set.
//!
//! Favorites are a local convenience list of listings, keyed by listing id and
//! stored as a single JSON array under `chaingo_favorites`. They survive
//! logout.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::storage::keys::FAVORITES;
use crate::storage::{KeyValueStore, StoreResult};

/// Favorite stored in the local set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteEntry {
    /// Listing ID (unique key)
    #[serde(rename = "id")]
    pub listing_id: i64,
    pub title: String,
    /// Price as shown on the listing, kept verbatim
    pub price: String,
    /// Image reference (filename under `/uploads`)
    #[serde(
        rename = "image",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_ref: Option<String>,
    /// When the favorite was added
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

/// Fields supplied by the caller when adding a favorite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFavorite {
    pub listing_id: i64,
    pub title: String,
    pub price: String,
    pub image_ref: Option<String>,
}

/// Result of an add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

/// Favorites operations over an injected key-value store.
#[derive(Clone)]
pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the set in insertion order. Missing or corrupt data reads as empty.
    pub fn read_favorites(&self) -> Vec<FavoriteEntry> {
        let raw = match self.store.get(FAVORITES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Favorites unreadable; treating as empty");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Favorites corrupt; treating as empty");
            Vec::new()
        })
    }

    /// Replace the whole set.
    pub fn write_favorites(&self, favorites: &[FavoriteEntry]) -> StoreResult<()> {
        let raw = serde_json::to_string(favorites)?;
        self.store.set(FAVORITES, &raw)
    }

    /// Add a listing. A listing already in the set is left as is.
    pub fn add(&self, favorite: NewFavorite) -> StoreResult<FavoriteChange> {
        let mut favorites = self.read_favorites();
        if favorites
            .iter()
            .any(|entry| entry.listing_id == favorite.listing_id)
        {
            return Ok(FavoriteChange::AlreadyPresent);
        }

        favorites.push(FavoriteEntry {
            listing_id: favorite.listing_id,
            title: favorite.title,
            price: favorite.price,
            image_ref: favorite.image_ref.filter(|image| !image.is_empty()),
            added_at: Utc::now(),
        });
        self.write_favorites(&favorites)?;

        tracing::debug!(listing_id = favorite.listing_id, "Added favorite");
        Ok(FavoriteChange::Added)
    }

    /// Remove a listing. An absent listing leaves the set unchanged.
    pub fn remove(&self, listing_id: i64) -> StoreResult<FavoriteChange> {
        let favorites = self.read_favorites();
        let before = favorites.len();
        let remaining: Vec<_> = favorites
            .into_iter()
            .filter(|entry| entry.listing_id != listing_id)
            .collect();

        if remaining.len() == before {
            return Ok(FavoriteChange::NotPresent);
        }

        self.write_favorites(&remaining)?;
        tracing::debug!(listing_id, "Removed favorite");
        Ok(FavoriteChange::Removed)
    }

    pub fn contains(&self, listing_id: i64) -> bool {
        self.read_favorites()
            .iter()
            .any(|entry| entry.listing_id == listing_id)
    }

    pub fn count(&self) -> usize {
        self.read_favorites().len()
    }

    /// Favorites, most recently added first.
    pub fn list_by_recent(&self) -> Vec<FavoriteEntry> {
        let mut favorites = self.read_favorites();
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        favorites
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
