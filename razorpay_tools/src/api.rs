use std::sync::Arc;

use log::*;
use parley_common::MinorUnits;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::RazorpayConfig,
    data_objects::{NewOrderRequest, RazorpayOrder},
    OrderGateway,
    RazorpayApiError,
};

/// A thin client for Razorpay's REST API. Construct it once at start-up and share it; cloning is cheap.
#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl std::fmt::Debug for RazorpayApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RazorpayApi ({}, key id {})", self.config.api_url, self.config.key_id)
    }
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RazorpayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, RazorpayApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| RazorpayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| RazorpayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| RazorpayApiError::RestResponseError(e.to_string()))?;
            Err(RazorpayApiError::QueryError { status, message })
        }
    }
}

impl OrderGateway for RazorpayApi {
    async fn create_order(&self, amount: MinorUnits, currency: &str) -> Result<RazorpayOrder, RazorpayApiError> {
        if !amount.is_positive() {
            return Err(RazorpayApiError::InvalidAmount(format!("Order amount must be positive, not {amount}")));
        }
        let request = NewOrderRequest::new(amount, currency);
        debug!("💳️ Creating order for {amount} {currency}");
        let order = self.rest_query::<RazorpayOrder, _>(Method::POST, "/orders", Some(request)).await?;
        info!("💳️ Razorpay order {} created for {} {}", order.id, order.amount, order.currency);
        Ok(order)
    }
}
