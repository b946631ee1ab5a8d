//! Listing endpoints

use autobid_core::{CarAd, CarBrand, CarModel, ListingForm, ListingSubmission, SearchCriteria};
use chrono::Utc;

use super::request::{MultipartPayload, PendingRequest};
use super::{ApiClient, ClientError};

impl ApiClient {
    /// Search listings; unset criteria are not sent
    pub async fn search_listings(&self, criteria: &SearchCriteria) -> Result<Vec<CarAd>, ClientError> {
        self.execute(&PendingRequest::post("/CarAd/search").json(criteria)?)
            .await
    }

    /// Get a single listing
    pub async fn get_listing(&self, id: &str) -> Result<CarAd, ClientError> {
        self.execute(&PendingRequest::get("/CarAd").segment(id))
            .await
    }

    /// Listings owned by the logged-in user
    pub async fn my_listings(&self) -> Result<Vec<CarAd>, ClientError> {
        let user_id = self.session.require_user_id().await?;
        self.search_listings(&SearchCriteria::owned_by(user_id))
            .await
    }

    /// Create a listing with its images
    pub async fn create_listing(&self, form: &ListingForm) -> Result<CarAd, ClientError> {
        form.validate_at(ListingSubmission::Create, Utc::now())?;
        let payload = MultipartPayload::from_listing(form, ListingSubmission::Create);
        self.execute(&PendingRequest::post("/CarAd").multipart(payload))
            .await
    }

    /// Replace a listing's fields and images
    pub async fn update_listing(&self, id: &str, form: &ListingForm) -> Result<CarAd, ClientError> {
        form.validate_at(ListingSubmission::Update, Utc::now())?;
        let payload = MultipartPayload::from_listing(form, ListingSubmission::Update);
        self.execute(&PendingRequest::put("/CarAd").segment(id).multipart(payload))
            .await
    }

    pub async fn delete_listing(&self, id: &str) -> Result<(), ClientError> {
        self.execute_empty(&PendingRequest::delete("/CarAd").segment(id))
            .await
    }

    /// All brands with their models
    pub async fn list_brands(&self) -> Result<Vec<CarBrand>, ClientError> {
        self.execute(&PendingRequest::get("/CarAd/brands")).await
    }

    pub async fn list_models(&self, brand_id: i64) -> Result<Vec<CarModel>, ClientError> {
        let request = PendingRequest::get("/CarAd/brands")
            .segment(brand_id.to_string())
            .segment("models");
        self.execute(&request).await
    }
}
