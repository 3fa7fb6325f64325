//! HTTP client for the cocoa sales API

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("Failed after {attempts} attempts. Last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct CocoaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl CocoaClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("cocoa-ledger/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(CocoaClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: 3,
        })
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GETs are retried with linear backoff on transport errors and 5xx.
    async fn get(&self, path: &str) -> ClientResult<Value> {
        let url = self.url(path);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_server_error() => {
                    let status = response.status();
                    last_error = error_message(status, response.json::<Value>().await.ok());
                    warn!(attempt, %status, url = %url, "Server error, retrying");
                }
                Ok(response) => return into_json(response).await,
                Err(e) => {
                    last_error = format!("Request error: {}", e);
                    warn!(attempt, url = %url, error = %e, "Request failed, retrying");
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }

    /// POSTs are sent once; a retried sale could be recorded twice.
    async fn post(&self, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let mut request = self.client.request(Method::POST, self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        debug!(path, "POST");
        into_json(request.send().await?).await
    }

    pub async fn info(&self) -> ClientResult<Value> {
        self.get("/").await
    }

    pub async fn register(&self, wallet_address: Option<&str>) -> ClientResult<Value> {
        let body = wallet_address.map(|w| json!({ "walletAddress": w }));
        self.post("/register", body).await
    }

    pub async fn record_sale(
        &self,
        seller_id: &str,
        buyer_name: &str,
        quantity_kg: u64,
        price: u64,
    ) -> ClientResult<Value> {
        let body = json!({
            "sellerId": seller_id,
            "buyerName": buyer_name,
            "quantityKg": quantity_kg,
            "price": price
        });
        self.post("/sale", Some(body)).await
    }

    pub async fn sales(&self) -> ClientResult<Value> {
        self.get("/sales").await
    }

    pub async fn seller(&self, seller_id: &str) -> ClientResult<Value> {
        self.get(&format!("/seller/{}", seller_id)).await
    }

    pub async fn sales_summary(&self) -> ClientResult<Value> {
        self.get("/sales-summary").await
    }

    pub async fn blockchain(&self) -> ClientResult<Value> {
        self.get("/blockchain").await
    }

    pub async fn mine(&self) -> ClientResult<Value> {
        self.get("/mine").await
    }

    pub async fn blocks(&self, limit: Option<usize>) -> ClientResult<Value> {
        match limit {
            Some(limit) => self.get(&format!("/blocks?limit={}", limit)).await,
            None => self.get("/blocks").await,
        }
    }

    pub async fn verify(&self) -> ClientResult<Value> {
        self.get("/verify").await
    }

    pub async fn health(&self) -> ClientResult<Value> {
        self.get("/health").await
    }
}

async fn into_json(response: reqwest::Response) -> ClientResult<Value> {
    let status = response.status();
    let body = response.json::<Value>().await.ok();
    if status.is_success() {
        return Ok(body.unwrap_or(Value::Null));
    }
    Err(ClientError::Api {
        status,
        message: error_message(status, body),
    })
}

fn error_message(status: StatusCode, body: Option<Value>) -> String {
    body.as_ref()
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
