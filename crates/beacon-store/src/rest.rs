//! # REST Mirror Client
//!
//! The remote product/bill store, spoken over plain REST with an
//! `apikey` + bearer credential pair.
//!
//! ## Endpoints
//! ```text
//! GET    {base}/products               list all products
//! POST   {base}/products               insert one product
//! PATCH  {base}/products?id=eq.{id}    patch fields of one product
//! DELETE {base}/products?id=eq.{id}    delete one product
//! GET    {base}/bills                  list bill records
//! POST   {base}/bills                  insert one bill record
//! ```
//!
//! The [`Mirror`] trait is the seam: the catalog and outbox only see the
//! trait, so tests inject an in-memory fake instead of a server.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use beacon_core::types::{Bill, Product};
use beacon_core::Money;

use crate::error::{StoreError, StoreResult};

/// Request timeout for every mirror call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Patch Shape
// =============================================================================

/// A partial product update. Absent fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

// =============================================================================
// Mirror Trait
// =============================================================================

/// Table-like operations on the remote store.
///
/// Every method can fail with a [`StoreError`]; callers decide whether that
/// degrades (catalog load) or queues (outbox).
#[async_trait]
pub trait Mirror: Send + Sync {
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn patch_product(&self, id: i64, patch: &ProductPatch) -> StoreResult<()>;
    async fn delete_product(&self, id: i64) -> StoreResult<()>;
    async fn list_bills(&self) -> StoreResult<Vec<Bill>>;
    async fn insert_bill(&self, bill: &Bill) -> StoreResult<()>;
}

// =============================================================================
// REST Implementation
// =============================================================================

/// [`Mirror`] implementation over HTTP.
#[derive(Debug, Clone)]
pub struct RestMirror {
    client: reqwest::Client,
    base_url: String,
}

impl RestMirror {
    /// Creates a client for the given base URL and API key.
    ///
    /// The key travels both as an `apikey` header and as a bearer token,
    /// which is what hosted table stores expect.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(api_key)
            .map_err(|e| StoreError::InvalidBody(format!("invalid api key: {e}")))?;
        headers.insert("apikey", key_value);
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| StoreError::InvalidBody(format!("invalid api key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(RestMirror {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }
}

#[async_trait]
impl Mirror for RestMirror {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        debug!(url = %self.url("products"), "Listing products from mirror");
        let response = self
            .client
            .get(self.url("products"))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        debug!(product_id = product.id, barcode = %product.barcode, "Mirroring product insert");
        self.client
            .post(self.url("products"))
            .json(product)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn patch_product(&self, id: i64, patch: &ProductPatch) -> StoreResult<()> {
        debug!(product_id = id, "Mirroring product patch");
        self.client
            .patch(format!("{}?id=eq.{}", self.url("products"), id))
            .json(patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> StoreResult<()> {
        debug!(product_id = id, "Mirroring product delete");
        self.client
            .delete(format!("{}?id=eq.{}", self.url("products"), id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_bills(&self) -> StoreResult<Vec<Bill>> {
        let response = self
            .client
            .get(self.url("bills"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn insert_bill(&self, bill: &Bill) -> StoreResult<()> {
        debug!(bill_id = %bill.bill_id, "Mirroring bill insert");
        self.client
            .post(self.url("bills"))
            .json(bill)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rice_json() -> serde_json::Value {
        serde_json::json!([{
            "id": 1,
            "barcode": 1001,
            "name": "Rice",
            "price": 5000,
            "unit": "kg",
            "category": "Grains"
        }])
    }

    #[tokio::test]
    async fn test_list_products_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(header("apikey", "secret"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rice_json()))
            .mount(&server)
            .await;

        let mirror = RestMirror::new(server.uri(), "secret").unwrap();
        let products = mirror.list_products().await.unwrap();

        assert_eq!(products.len(), 1);
        // numeric barcode coerced to string
        assert_eq!(products[0].barcode, "1001");
        assert_eq!(products[0].price.cents(), 5000);
    }

    #[tokio::test]
    async fn test_list_products_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mirror = RestMirror::new(server.uri(), "secret").unwrap();
        let err = mirror.list_products().await.unwrap_err();
        assert!(matches!(err, StoreError::Status { code: 503 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_patch_targets_single_row() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/products"))
            .and(query_param("id", "eq.7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mirror = RestMirror::new(server.uri(), "secret").unwrap();
        let patch = ProductPatch {
            price: Some(Money::from_cents(3500)),
            ..Default::default()
        };
        mirror.patch_product(7, &patch).await.unwrap();
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = ProductPatch {
            name: Some("Brown Bread".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"name":"Brown Bread"}"#);
    }
}
