//! Autobid core types and utilities

pub mod error;
pub mod storage;
pub mod tracing;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ErrorContext};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageKey};
pub use types::{
    AuthResponse, Bid, BidForm, CarAd, CarBrand, CarModel, ImageUpload, ListingForm,
    ListingSubmission, LoginForm, RegisterForm, SearchCriteria,
};
pub use validation::{Validate, ValidationError};
