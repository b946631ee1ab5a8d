//! Client-side form validation
//!
//! These checks mirror the rules the storefront forms enforce before a
//! payload is sent. The backend remains the authority; passing here only means
//! the request is worth dispatching.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{BidForm, CarAd, ListingForm, ListingSubmission, LoginForm, RegisterForm};

/// Maximum number of images a listing may carry
pub const MAX_LISTING_IMAGES: usize = 15;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trait for payloads that can be checked before submission
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Common validation helpers
pub mod validators {
    use super::ValidationError;

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "is required"));
        }
        Ok(())
    }

    /// Validate email format (basic check)
    pub fn validate_email(email: &str, field: &'static str) -> Result<(), ValidationError> {
        validate_not_empty(email, field)?;
        let mut parts = email.split('@');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None)
                if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        );
        if !valid {
            return Err(ValidationError::new(field, "invalid email format"));
        }
        Ok(())
    }

    /// Validate that a value is within range
    pub fn validate_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &'static str,
    ) -> Result<(), ValidationError> {
        if value < min || value > max {
            return Err(ValidationError::new(
                field,
                format!("must be between {min} and {max}"),
            ));
        }
        Ok(())
    }

    /// Validate that a value is at least `min`
    pub fn validate_min<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        field: &'static str,
    ) -> Result<(), ValidationError> {
        if value < min {
            return Err(ValidationError::new(field, format!("must be at least {min}")));
        }
        Ok(())
    }
}

use validators::{validate_email, validate_min, validate_not_empty, validate_range};

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email, "email")?;
        validate_not_empty(&self.password, "password")
    }
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_not_empty(&self.first_name, "firstName")?;
        validate_not_empty(&self.last_name, "lastName")?;
        validate_email(&self.email, "email")?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::new(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        Ok(())
    }
}

impl Validate for BidForm {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_not_empty(&self.car_ad_id, "carAdId")?;
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::new("amount", "must be positive"));
        }
        Ok(())
    }
}

impl BidForm {
    /// Check the bid against the listing it targets
    pub fn check_against(&self, listing: &CarAd) -> Result<(), ValidationError> {
        self.validate()?;
        if !listing.is_biddable {
            return Err(ValidationError::new("carAdId", "listing does not accept bids"));
        }
        if listing.is_sold {
            return Err(ValidationError::new("carAdId", "listing is already sold"));
        }
        let minimum = listing.minimum_bid();
        if self.amount < minimum {
            return Err(ValidationError::new(
                "amount",
                format!("bid must be at least {minimum}"),
            ));
        }
        Ok(())
    }
}

impl ListingForm {
    /// Validate the form for the given submission, relative to `now`
    pub fn validate_at(
        &self,
        submission: ListingSubmission,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        validate_min(self.car_model_id, 1, "carModelId")?;
        validate_not_empty(&self.registration_number, "registrationNumber")?;
        validate_not_empty(&self.technical_data, "technicalData")?;
        validate_not_empty(&self.equipment, "equipment")?;
        validate_not_empty(&self.description, "description")?;
        if let Some(price) = self.fixed_price {
            validate_min(price, Decimal::ZERO, "fixedPrice")?;
        }

        if self.is_biddable {
            let end = self
                .auction_end_date
                .ok_or_else(|| ValidationError::new("auctionEndDate", "is required for auctions"))?;
            if submission == ListingSubmission::Create && end <= now {
                return Err(ValidationError::new("auctionEndDate", "must be a future date"));
            }
        }

        validate_range(self.images.len(), 1, MAX_LISTING_IMAGES, "images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageUpload;
    use chrono::Duration;

    fn listing(now: DateTime<Utc>) -> ListingForm {
        ListingForm {
            car_model_id: 1,
            registration_number: "ABC123".into(),
            technical_data: "150 hp".into(),
            is_imported: true,
            equipment: "Winter tyres".into(),
            description: "One owner".into(),
            fixed_price: None,
            is_biddable: true,
            auction_end_date: Some(now + Duration::days(7)),
            images: vec![ImageUpload::new("a.jpg", vec![0u8])],
        }
    }

    #[test]
    fn test_login_form() {
        let mut form = LoginForm {
            email: "a@b.com".into(),
            password: "x".into(),
        };
        assert!(form.validate().is_ok());

        form.email = "not-an-email".into();
        assert_eq!(form.validate().unwrap_err().field, "email");
    }

    #[test]
    fn test_register_password_length() {
        let form = RegisterForm {
            first_name: "Anna".into(),
            last_name: "Berg".into(),
            email: "anna@example.se".into(),
            password: "12345".into(),
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.field, "password");
        assert_eq!(err.to_string(), "password: must be at least 6 characters");
    }

    #[test]
    fn test_listing_accepts_valid_auction() {
        let now = Utc::now();
        assert!(listing(now).validate_at(ListingSubmission::Create, now).is_ok());
    }

    #[test]
    fn test_listing_image_bounds() {
        let now = Utc::now();
        let mut form = listing(now);
        form.images.clear();
        assert_eq!(
            form.validate_at(ListingSubmission::Create, now).unwrap_err().field,
            "images"
        );

        form.images = vec![ImageUpload::new("a.jpg", vec![0u8]); MAX_LISTING_IMAGES + 1];
        assert_eq!(
            form.validate_at(ListingSubmission::Update, now).unwrap_err().field,
            "images"
        );

        form.images.truncate(MAX_LISTING_IMAGES);
        assert!(form.validate_at(ListingSubmission::Update, now).is_ok());
    }

    #[test]
    fn test_auction_end_date_must_be_in_future_on_create() {
        let now = Utc::now();
        let mut form = listing(now);
        form.auction_end_date = Some(now - Duration::hours(1));

        let err = form.validate_at(ListingSubmission::Create, now).unwrap_err();
        assert_eq!(err.field, "auctionEndDate");
        // An edit keeps whatever end date the listing already had
        assert!(form.validate_at(ListingSubmission::Update, now).is_ok());

        form.auction_end_date = None;
        assert!(form.validate_at(ListingSubmission::Update, now).is_err());
    }

    #[test]
    fn test_negative_fixed_price_rejected() {
        let now = Utc::now();
        let mut form = listing(now);
        form.fixed_price = Some(Decimal::NEGATIVE_ONE);
        assert_eq!(
            form.validate_at(ListingSubmission::Create, now).unwrap_err().field,
            "fixedPrice"
        );
    }

    #[test]
    fn test_bid_must_beat_current_highest() {
        let ad: CarAd = serde_json::from_value(serde_json::json!({
            "id": "ad-1",
            "userId": "U2",
            "carModelId": 1,
            "registrationNumber": "XYZ789",
            "isImported": false,
            "isBiddable": true,
            "currentHighestBid": 1000,
            "createdAt": "2024-01-01T00:00:00Z",
            "isSold": false
        }))
        .unwrap();

        let low = BidForm {
            car_ad_id: "ad-1".into(),
            amount: Decimal::from(1000),
        };
        assert_eq!(low.check_against(&ad).unwrap_err().field, "amount");

        let ok = BidForm {
            car_ad_id: "ad-1".into(),
            amount: Decimal::from(1001),
        };
        assert!(ok.check_against(&ad).is_ok());
    }
}
