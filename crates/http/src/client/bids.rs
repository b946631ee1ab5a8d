//! Bidding endpoints

use autobid_core::{Bid, BidForm, Validate};

use super::request::PendingRequest;
use super::{ApiClient, ClientError};

impl ApiClient {
    /// Place a bid
    pub async fn place_bid(&self, form: &BidForm) -> Result<Bid, ClientError> {
        form.validate()?;
        self.execute(&PendingRequest::post("/Bid").json(form)?)
            .await
    }

    /// Fetch the listing first and reject bids it could never accept
    pub async fn place_checked_bid(&self, form: &BidForm) -> Result<Bid, ClientError> {
        let listing = self.get_listing(&form.car_ad_id).await?;
        form.check_against(&listing)?;
        self.place_bid(form).await
    }

    /// Bids on a listing
    pub async fn list_bids(&self, car_ad_id: &str) -> Result<Vec<Bid>, ClientError> {
        self.execute(&PendingRequest::get("/Bid/carAd").segment(car_ad_id))
            .await
    }

    /// Buy a listing at its fixed price
    pub async fn buy_now(&self, car_ad_id: &str) -> Result<(), ClientError> {
        self.execute_empty(&PendingRequest::post("/Bid/buy").segment(car_ad_id))
            .await
    }
}
