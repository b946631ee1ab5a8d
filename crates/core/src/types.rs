//! Marketplace payloads exchanged with the backend
//!
//! Field names follow the backend's camelCase JSON. The client passes these
//! through without interpreting business fields.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::CoreResult;

/// Token pair and identity returned by login, registration and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A car listing, either an auction or a fixed-price sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarAd {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub car_model_id: i64,
    #[serde(default)]
    pub car_brand: String,
    #[serde(default)]
    pub car_model: String,
    pub registration_number: String,
    #[serde(default)]
    pub technical_data: String,
    pub is_imported: bool,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fixed_price: Option<Decimal>,
    pub is_biddable: bool,
    #[serde(default)]
    pub current_highest_bid: Option<Decimal>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub auction_end_date: Option<DateTime<Utc>>,
    pub is_sold: bool,
    #[serde(default)]
    pub has_down_payment: bool,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl CarAd {
    /// Lowest amount a new bid must reach to be accepted by the listing page
    pub fn minimum_bid(&self) -> Decimal {
        self.current_highest_bid.unwrap_or_default() + Decimal::ONE
    }

    /// Whether the listing can be bought outright
    pub fn is_buyable(&self) -> bool {
        !self.is_sold && self.fixed_price.is_some_and(|p| !p.is_zero())
    }
}

/// A bid placed on a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub car_ad_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub amount: Decimal,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Brand reference data used for search facets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarBrand {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub models: Vec<CarModel>,
}

/// Model reference data, owned by a brand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarModel {
    pub id: i64,
    pub name: String,
    pub car_brand_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidForm {
    pub car_ad_id: String,
    pub amount: Decimal,
}

/// Listing search filters; unset filters are left out of the request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_brand_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_model_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_imported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_biddable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SearchCriteria {
    /// Criteria matching only listings owned by `user_id`
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = (!keyword.is_empty()).then_some(keyword);
        self
    }
}

/// An image attached to a listing upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read an image from disk, guessing its content type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Fields submitted when creating or editing a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingForm {
    pub car_model_id: i64,
    pub registration_number: String,
    pub technical_data: String,
    pub is_imported: bool,
    pub equipment: String,
    pub description: String,
    pub fixed_price: Option<Decimal>,
    pub is_biddable: bool,
    pub auction_end_date: Option<DateTime<Utc>>,
    pub images: Vec<ImageUpload>,
}

/// Whether a listing form is being submitted as a new listing or an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSubmission {
    Create,
    Update,
}

impl ListingSubmission {
    /// Multipart part name the backend binds images from
    pub const fn image_field(self) -> &'static str {
        match self {
            Self::Create => "Images",
            Self::Update => "images",
        }
    }
}

impl ListingForm {
    /// Text fields of the multipart body, in submission order
    pub fn text_fields(&self, submission: ListingSubmission) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("carModelId", self.car_model_id.to_string()),
            ("registrationNumber", self.registration_number.clone()),
            ("technicalData", self.technical_data.clone()),
            ("isImported", self.is_imported.to_string()),
            ("equipment", self.equipment.clone()),
            ("description", self.description.clone()),
        ];
        if let Some(price) = self.fixed_price.filter(|p| !p.is_zero()) {
            fields.push(("fixedPrice", price.normalize().to_string()));
        }
        fields.push(("isBiddable", self.is_biddable.to_string()));

        let send_end_date = match submission {
            ListingSubmission::Create => self.is_biddable,
            ListingSubmission::Update => true,
        };
        if let Some(end) = self.auction_end_date.filter(|_| send_end_date) {
            fields.push((
                "auctionEndDate",
                end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        fields
    }
}

/// Serde helpers for backend timestamps
///
/// The backend emits RFC 3339 timestamps, but values stored without an offset
/// come back as naive date-times; those are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => super::parse(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
