// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing operations.
//!
//! These are not part of [`super::MarketplaceBackend`]: the auth gate and the
//! purchase flow receive listings from the caller and never browse.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer, Serialize};

use super::client::HttpBackendClient;
use super::BackendError;

/// Default page size used by the marketplace UI.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size the backend accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Marketplace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// STX decimal string
    pub price: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "item_condition")]
    pub condition: Option<String>,
    /// Seller username, empty when the backend has none
    #[serde(rename = "username", default, deserialize_with = "null_as_empty")]
    pub seller_username: String,
    /// Image filenames under `/uploads`
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(default)]
    pub buyer_username: Option<String>,
    #[serde(default)]
    pub sold_at: Option<String>,
}

/// The backend's username column is nullable.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Listing {
    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// One page of active listings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingPage {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_items: u64,
    #[serde(default)]
    pub listings: Vec<Listing>,
}

/// A listing bought by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PurchaseRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "item_condition")]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub seller_username: String,
    #[serde(default)]
    pub buyer_username: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub sold_at: Option<String>,
}

/// Image attached to a new listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ListingImage {
    fn mime(&self) -> &'static str {
        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// New listing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    /// STX decimal string
    pub price: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub condition: Option<String>,
    /// Seller username
    pub username: String,
    pub images: Vec<ListingImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedListing {
    pub listing_id: i64,
    #[serde(default)]
    pub uploaded_images: Vec<String>,
}

#[derive(Deserialize)]
struct ListingsEnvelope {
    #[serde(default)]
    listings: Vec<Listing>,
}

#[derive(Deserialize)]
struct PurchasesEnvelope {
    #[serde(default)]
    purchases: Vec<PurchaseRecord>,
}

impl HttpBackendClient {
    /// `GET /list_active_listings`. Pages are served from the listing cache
    /// while fresh.
    pub async fn list_active_listings(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, BackendError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        if let Some(cached) = self.listing_cache().get(page, page_size) {
            tracing::debug!(page, page_size, "Listing page served from cache");
            return Ok(cached);
        }

        let label = "GET /list_active_listings";
        let fetched: ListingPage = self
            .guarded(label, async {
                let request = self
                    .http()
                    .get(self.url("/list_active_listings"))
                    .query(&[("page", page), ("page_size", page_size)]);
                self.fetch_json(label, request).await
            })
            .await?;

        self.listing_cache().put(page, page_size, fetched.clone());
        Ok(fetched)
    }

    /// `GET /get_listing/{id}`. Unknown ids are `None`.
    pub async fn get_listing(&self, listing_id: i64) -> Result<Option<Listing>, BackendError> {
        let label = "GET /get_listing";
        self.guarded(label, async {
            let request = self.http().get(self.url(&format!("/get_listing/{listing_id}")));
            let response = self.send(label, request).await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = Self::check(label, response).await?;
            Self::read_json(label, response).await.map(Some)
        })
        .await
    }

    /// `POST /create_listing` (multipart).
    ///
    /// Only the backend record is created; no product is minted on chain.
    pub async fn create_listing(&self, listing: NewListing) -> Result<CreatedListing, BackendError> {
        let label = "POST /create_listing";

        let mut form = Form::new()
            .text("title", listing.title)
            .text("description", listing.description)
            .text("price", listing.price)
            .text("username", listing.username.clone());
        let optional = [
            ("category", listing.category),
            ("location", listing.location),
            ("condition", listing.condition),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }
        for image in listing.images {
            let mime = image.mime();
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(mime)
                .map_err(|e| BackendError::invalid_response(format!("invalid image type: {e}")))?;
            form = form.part("images", part);
        }

        let created: CreatedListing = self
            .guarded(label, async {
                let request = self.http().post(self.url("/create_listing")).multipart(form);
                self.fetch_json(label, request).await
            })
            .await?;

        self.listing_cache().invalidate_all();
        tracing::info!(
            listing_id = created.listing_id,
            username = %listing.username,
            images = created.uploaded_images.len(),
            "Listing created"
        );
        Ok(created)
    }

    /// `DELETE /delete_listing/{id}?username=`. Only the seller may delete.
    pub async fn delete_listing(&self, listing_id: i64, username: &str) -> Result<(), BackendError> {
        let label = "DELETE /delete_listing";
        self.guarded(label, async {
            let request = self
                .http()
                .delete(self.url(&format!("/delete_listing/{listing_id}")))
                .query(&[("username", username)]);
            let response = self.send(label, request).await?;
            Self::check(label, response).await?;
            Ok(())
        })
        .await?;

        self.listing_cache().invalidate_all();
        tracing::info!(listing_id, username = %username, "Listing deleted");
        Ok(())
    }

    /// `GET /get_user_listings`, newest first.
    pub async fn user_listings(&self, username: &str) -> Result<Vec<Listing>, BackendError> {
        let label = "GET /get_user_listings";
        self.guarded(label, async {
            let request = self
                .http()
                .get(self.url("/get_user_listings"))
                .query(&[("username", username)]);
            let envelope: ListingsEnvelope = self.fetch_json(label, request).await?;
            Ok(envelope.listings)
        })
        .await
    }

    /// `GET /get_user_purchases`, most recent sale first.
    pub async fn user_purchases(&self, username: &str) -> Result<Vec<PurchaseRecord>, BackendError> {
        let label = "GET /get_user_purchases";
        self.guarded(label, async {
            let request = self
                .http()
                .get(self.url("/get_user_purchases"))
                .query(&[("username", username)]);
            let envelope: PurchasesEnvelope = self.fetch_json(label, request).await?;
            Ok(envelope.purchases)
        })
        .await
    }

    /// Public URL of an uploaded image. Absolute URLs pass through.
    pub fn image_url(&self, image: &str) -> String {
        if image.starts_with("http://") || image.starts_with("https://") {
            return image.to_string();
        }
        self.url(&format!("/uploads/{}", image.trim_start_matches('/')))
    }
}
