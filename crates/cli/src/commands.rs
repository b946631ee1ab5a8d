//! CLI commands

use anyhow::{Context, Result};
use autobid_core::{
    BidForm, FileStore, ImageUpload, ListingForm, LoginForm, RegisterForm, SearchCriteria,
};
use autobid_http::{ApiClient, Navigator};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CliConfig;

/// File under the data directory holding the persisted session
pub const SESSION_FILE: &str = "session.json";

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "AUTOBID_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in as it
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "AUTOBID_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a session is stored
    Status,

    /// Exchange the stored refresh token for new tokens
    Refresh,

    /// Search listings
    Search(SearchArgs),

    /// Show one listing
    Show { id: String },

    /// List your own listings
    Mine,

    /// Create a listing
    Create(ListingArgs),

    /// Replace a listing's details and images
    Update {
        id: String,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Delete a listing
    Delete { id: String },

    /// List car brands with their models
    Brands,

    /// List the models of a brand
    Models { brand_id: i64 },

    /// Bid on an auction
    Bid {
        car_ad_id: String,

        amount: Decimal,

        /// Skip fetching the listing to check the bid first
        #[arg(long)]
        unchecked: bool,
    },

    /// List bids on a listing
    Bids { car_ad_id: String },

    /// Buy a listing at its fixed price
    Buy { car_ad_id: String },
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Free-text keyword
    #[arg(long)]
    keyword: Option<String>,

    /// Brand id
    #[arg(long)]
    brand: Option<i64>,

    /// Model id
    #[arg(long)]
    model: Option<i64>,

    #[arg(long)]
    min_price: Option<Decimal>,

    #[arg(long)]
    max_price: Option<Decimal>,

    /// Only imported cars
    #[arg(long)]
    imported: bool,

    /// Only auctions
    #[arg(long)]
    biddable: bool,
}

impl SearchArgs {
    pub fn into_criteria(self) -> SearchCriteria {
        let criteria = SearchCriteria {
            car_brand_id: self.brand,
            car_model_id: self.model,
            min_price: self.min_price,
            max_price: self.max_price,
            is_imported: self.imported.then_some(true),
            is_biddable: self.biddable.then_some(true),
            ..SearchCriteria::default()
        };
        match self.keyword {
            Some(keyword) => criteria.keyword(keyword),
            None => criteria,
        }
    }
}

#[derive(Args, Debug)]
pub struct ListingArgs {
    /// Car model id
    #[arg(long = "model")]
    car_model_id: i64,

    #[arg(long)]
    registration_number: String,

    #[arg(long)]
    technical_data: String,

    #[arg(long)]
    equipment: String,

    #[arg(long)]
    description: String,

    #[arg(long)]
    imported: bool,

    /// Buy-now price
    #[arg(long)]
    fixed_price: Option<Decimal>,

    /// Sell by auction
    #[arg(long)]
    biddable: bool,

    /// Auction end, RFC 3339 (e.g. 2030-01-31T18:00:00Z)
    #[arg(long)]
    auction_end: Option<DateTime<Utc>>,

    /// Image file, repeat for several (1 to 15)
    #[arg(long = "image", required = true)]
    images: Vec<PathBuf>,
}

impl ListingArgs {
    async fn into_form(self) -> Result<ListingForm> {
        let mut images = Vec::with_capacity(self.images.len());
        for path in &self.images {
            let image = ImageUpload::from_path(path)
                .await
                .with_context(|| format!("reading image {}", path.display()))?;
            images.push(image);
        }

        Ok(ListingForm {
            car_model_id: self.car_model_id,
            registration_number: self.registration_number,
            technical_data: self.technical_data,
            is_imported: self.imported,
            equipment: self.equipment,
            description: self.description,
            fixed_price: self.fixed_price,
            is_biddable: self.biddable,
            auction_end_date: self.auction_end,
            images,
        })
    }
}

/// Tells the user to log in again once a refresh has failed
struct LoginHint;

impl Navigator for LoginHint {
    fn to_login(&self) {
        warn!("Session expired; run `autobid login` to sign in again");
    }
}

impl Commands {
    pub async fn execute(self, config: CliConfig, data_dir: PathBuf) -> Result<()> {
        let session_file = data_dir.join(SESSION_FILE);
        let client = ApiClient::builder()
            .config(config.client)
            .storage(Arc::new(FileStore::new(&session_file)))
            .navigator(LoginHint)
            .build()
            .await?;

        match self {
            Self::Login { email, password } => {
                client.login(&LoginForm { email, password }).await?;
                info!(session = %session_file.display(), "Logged in");
                print_status(&client).await
            }
            Self::Register {
                first_name,
                last_name,
                email,
                password,
            } => {
                let form = RegisterForm {
                    first_name,
                    last_name,
                    email,
                    password,
                };
                client.register(&form).await?;
                print_status(&client).await
            }
            Self::Logout => {
                client.logout().await;
                print_status(&client).await
            }
            Self::Status => print_status(&client).await,
            Self::Refresh => {
                client.refresh().await?;
                print_status(&client).await
            }
            Self::Search(args) => {
                print_json(&client.search_listings(&args.into_criteria()).await?)
            }
            Self::Show { id } => print_json(&client.get_listing(&id).await?),
            Self::Mine => print_json(&client.my_listings().await?),
            Self::Create(listing) => {
                let form = listing.into_form().await?;
                print_json(&client.create_listing(&form).await?)
            }
            Self::Update { id, listing } => {
                let form = listing.into_form().await?;
                print_json(&client.update_listing(&id, &form).await?)
            }
            Self::Delete { id } => {
                client.delete_listing(&id).await?;
                print_json(&json!({ "deleted": id }))
            }
            Self::Brands => print_json(&client.list_brands().await?),
            Self::Models { brand_id } => print_json(&client.list_models(brand_id).await?),
            Self::Bid {
                car_ad_id,
                amount,
                unchecked,
            } => {
                let form = BidForm { car_ad_id, amount };
                let bid = if unchecked {
                    client.place_bid(&form).await?
                } else {
                    client.place_checked_bid(&form).await?
                };
                print_json(&bid)
            }
            Self::Bids { car_ad_id } => print_json(&client.list_bids(&car_ad_id).await?),
            Self::Buy { car_ad_id } => {
                client.buy_now(&car_ad_id).await?;
                print_json(&json!({ "bought": car_ad_id }))
            }
        }
    }
}

async fn print_status(client: &ApiClient) -> Result<()> {
    let session = client.session().snapshot().await;
    print_json(&json!({
        "authenticated": session.is_authenticated(),
        "userId": session.user_id,
        "lastError": session.last_error,
        "baseUrl": client.base_url(),
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
