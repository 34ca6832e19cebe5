//! Payment provider integration
//!
//! A single outbound call: create a checkout transaction for the configured
//! price and hand back the hosted checkout URL. Everything else (the checkout
//! UI, payment capture) happens on the provider's side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BillingConfig;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("request to payment provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("payment provider response had no checkout URL")]
    MissingCheckoutUrl,
}

/// Payment provider contract
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a checkout transaction for the upgrade price and return the
    /// URL the customer should be redirected to.
    async fn create_checkout(
        &self,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, BillingError>;
}

/// Paddle Billing API client
pub struct PaddleCheckout {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    price_id: String,
}

impl PaddleCheckout {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            price_id: config.price_id.clone(),
        }
    }
}

#[derive(Serialize)]
struct TransactionRequest<'a> {
    items: Vec<TransactionItem<'a>>,
    customer: Customer<'a>,
    checkout: Checkout<'a>,
}

#[derive(Serialize)]
struct TransactionItem<'a> {
    price_id: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct Customer<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Checkout<'a> {
    settings: CheckoutSettings<'a>,
}

#[derive(Serialize)]
struct CheckoutSettings<'a> {
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Deserialize)]
struct TransactionResponse {
    data: TransactionData,
}

#[derive(Deserialize)]
struct TransactionData {
    checkout: Option<CheckoutData>,
}

#[derive(Deserialize)]
struct CheckoutData {
    url: Option<String>,
}

#[async_trait]
impl CheckoutProvider for PaddleCheckout {
    async fn create_checkout(
        &self,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, BillingError> {
        let request = TransactionRequest {
            items: vec![TransactionItem {
                price_id: &self.price_id,
                quantity: 1,
            }],
            customer: Customer {
                email: customer_email,
            },
            checkout: Checkout {
                settings: CheckoutSettings {
                    success_url,
                    cancel_url,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/transactions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let transaction: TransactionResponse = response.json().await?;

        transaction
            .data
            .checkout
            .and_then(|c| c.url)
            .ok_or(BillingError::MissingCheckoutUrl)
    }
}
