//! Barcode product lookup (Open Food Facts)
//!
//! Lookups never fail loudly: an unknown barcode, a transport error or an
//! unreadable response all come back as `None`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FrigoResult;

/// Product metadata shown after a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub quantity: Option<String>,
    pub image_url: Option<String>,
    pub nutriscore_grade: Option<String>,
}

impl ProductInfo {
    /// Label to prefill when adding the scanned product to a list
    pub fn display_name(&self) -> Option<String> {
        let name = self.product_name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        match self.brands.as_deref().map(str::trim) {
            Some(brand) if !brand.is_empty() => Some(format!("{} ({})", name, brand)),
            _ => Some(name.to_string()),
        }
    }
}

/// Anything that can resolve a barcode to product metadata
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Option<ProductInfo>;
}

/// EAN-8 through GTIN-14: digits only
pub fn is_valid_barcode(barcode: &str) -> bool {
    (8..=14).contains(&barcode.len()) && barcode.bytes().all(|b| b.is_ascii_digit())
}

/// Extract product metadata from an Open Food Facts v0 response.
///
/// A hit requires `status == 1` and a `product` object.
pub fn parse_response(body: &Value) -> Option<ProductInfo> {
    if body.get("status").and_then(Value::as_i64) != Some(1) {
        return None;
    }
    let product = body.get("product")?.as_object()?;
    let field = |name: &str| {
        product
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Some(ProductInfo {
        product_name: field("product_name"),
        brands: field("brands"),
        quantity: field("quantity"),
        image_url: field("image_url"),
        nutriscore_grade: field("nutriscore_grade"),
    })
}

/// HTTP client for the Open Food Facts product API
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: impl Into<String>) -> FrigoResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("frigoflow/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn product_url(&self, barcode: &str) -> String {
        format!("{}/api/v0/product/{}.json", self.base_url, barcode)
    }

    async fn fetch(&self, barcode: &str) -> FrigoResult<Value> {
        let body = self
            .http
            .get(self.product_url(barcode))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Option<ProductInfo> {
        let barcode = barcode.trim();
        if !is_valid_barcode(barcode) {
            debug!(barcode, "Not a barcode, skipping lookup");
            return None;
        }
        match self.fetch(barcode).await {
            Ok(body) => {
                let info = parse_response(&body);
                debug!(barcode, found = info.is_some(), "Product lookup");
                info
            }
            Err(e) => {
                warn!(barcode, error = %e, "Product lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_barcode_validation() {
        assert!(is_valid_barcode("3274080005003"));
        assert!(is_valid_barcode("12345678"));
        assert!(!is_valid_barcode("1234567"));
        assert!(!is_valid_barcode("123456789012345"));
        assert!(!is_valid_barcode("32740800O5003"));
    }

    #[test]
    fn test_parse_hit() {
        let body = json!({
            "status": 1,
            "product": {
                "product_name": "Eau minérale",
                "brands": "Cristaline",
                "quantity": "1.5 L",
                "nutriscore_grade": "a"
            }
        });
        let info = parse_response(&body).unwrap();
        assert_eq!(info.product_name.as_deref(), Some("Eau minérale"));
        assert_eq!(info.nutriscore_grade.as_deref(), Some("a"));
        assert!(info.image_url.is_none());
        assert_eq!(info.display_name().unwrap(), "Eau minérale (Cristaline)");
    }

    #[test]
    fn test_parse_miss() {
        assert!(parse_response(&json!({"status": 0, "status_verbose": "product not found"})).is_none());
        assert!(parse_response(&json!({"status": 1})).is_none());
        assert!(parse_response(&json!("garbage")).is_none());
    }

    #[test]
    fn test_display_name_without_brand() {
        let info = ProductInfo {
            product_name: Some("Baguette".to_string()),
            brands: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(info.display_name().unwrap(), "Baguette");
        assert!(ProductInfo::default().display_name().is_none());
    }

    #[test]
    fn test_product_url() {
        let client = OpenFoodFactsClient::new("http://localhost:9999/").unwrap();
        assert_eq!(
            client.product_url("3274080005003"),
            "http://localhost:9999/api/v0/product/3274080005003.json"
        );
    }

    #[tokio::test]
    async fn test_invalid_barcode_skips_request() {
        let client = OpenFoodFactsClient::new("http://127.0.0.1:1").unwrap();
        assert!(client.lookup("not-a-code").await.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_none() {
        // Nothing listens on port 1
        let client = OpenFoodFactsClient::new("http://127.0.0.1:1").unwrap();
        assert!(client.lookup("3274080005003").await.is_none());
    }
}
