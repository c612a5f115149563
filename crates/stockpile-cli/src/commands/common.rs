use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use stockpile_core::models::{Product, ProductId};
use stockpile_core::queue::{EditQueue, HttpTransport, JsonFileQueueStore, QueueConfig};

use crate::client::ApiClient;
use crate::error::CliError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared per-invocation state resolved from global flags
#[derive(Debug)]
pub struct Context {
    pub base_url: String,
    pub token: String,
    pub queue_path: PathBuf,
}

impl Context {
    pub fn resolve(
        base_url: String,
        token: Option<String>,
        queue_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let token = token.ok_or_else(|| {
            CliError::Config(
                "No API token set. Pass --token or set STOCKPILE_API_TOKEN.".to_string(),
            )
        })?;
        let queue_path = match queue_path {
            Some(path) => path,
            None => default_queue_path()?,
        };
        Ok(Self {
            base_url,
            token,
            queue_path,
        })
    }

    pub fn client(&self) -> Result<ApiClient, CliError> {
        ApiClient::new(&self.base_url, &self.token, REQUEST_TIMEOUT)
    }

    /// Open the file-backed offline queue with an HTTP transport pointed at
    /// the configured API
    pub fn open_queue(&self) -> Result<Arc<EditQueue<HttpTransport>>, CliError> {
        tracing::debug!(path = %self.queue_path.display(), "Opening offline queue");
        let store = Arc::new(JsonFileQueueStore::open(&self.queue_path)?);
        let transport = HttpTransport::new(&self.base_url, &self.token, REQUEST_TIMEOUT)
            .map_err(|error| CliError::Network(error.to_string()))?;
        Ok(EditQueue::new(store, transport, QueueConfig::default()))
    }
}

pub fn default_queue_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("stockpile").join("queue.json"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, CliError> {
    let trimmed = raw.trim();
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidId(trimmed.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ProductListItem {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub price: String,
    pub price_cents: i64,
    pub version: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

pub fn product_to_list_item(product: &Product) -> ProductListItem {
    let now_ms = Utc::now().timestamp_millis();
    ProductListItem {
        id: product.id.to_string(),
        name: product.name.clone(),
        sku: product.sku.clone(),
        quantity: product.quantity,
        price: format_price(product.price_cents),
        price_cents: product.price_cents,
        version: product.version,
        updated_at: product.updated_at,
        relative_time: format_relative_time(product.updated_at, now_ms),
    }
}

pub fn format_product_lines(products: &[Product]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    products
        .iter()
        .map(|product| {
            let id = product.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let sku = product.sku.as_deref().unwrap_or("-");
            let price = format_price(product.price_cents);
            let relative_time = format_relative_time(product.updated_at, now_ms);

            format!(
                "{short_id:<13}  {:<24}  {sku:<12}  qty {:<6}  {price:>10}  v{:<4}  {relative_time}",
                truncate(&product.name, 24),
                product.quantity,
                product.version,
            )
        })
        .collect()
}

pub fn print_product(product: &Product) {
    println!("id:        {}", product.id);
    println!("name:      {}", product.name);
    println!("sku:       {}", product.sku.as_deref().unwrap_or("-"));
    println!("quantity:  {}", product.quantity);
    println!("price:     {}", format_price(product.price_cents));
    println!("version:   {}", product.version);
    println!(
        "updated:   {}",
        format_timestamp(product.updated_at)
    );
}

pub fn format_price(price_cents: i64) -> String {
    let sign = if price_cents < 0 { "-" } else { "" };
    let cents = price_cents.unsigned_abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format_timestamp(timestamp_ms)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stockpile_core::models::ProductDraft;

    #[test]
    fn format_price_renders_dollars_and_cents() {
        assert_eq!(format_price(0), "$0.00");
        assert_eq!(format_price(5), "$0.05");
        assert_eq!(format_price(1599), "$15.99");
        assert_eq!(format_price(-250), "-$2.50");
    }

    #[test]
    fn parse_product_id_trims_and_validates() {
        let id = ProductId::new();
        let parsed = parse_product_id(&format!("  {id}  ")).unwrap();
        assert_eq!(parsed, id);

        assert!(matches!(
            parse_product_id("not-a-uuid"),
            Err(CliError::InvalidId(_))
        ));
    }

    #[test]
    fn format_relative_time_units() {
        let now = 10_000_000_000;
        assert_eq!(format_relative_time(now - 30_000, now), "just now");
        assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
        assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    }

    #[test]
    fn product_lines_show_version_and_price() {
        let product = Product::new(ProductDraft {
            name: "Espresso Beans 1kg".to_string(),
            sku: Some("BEAN-1".to_string()),
            quantity: 12,
            price_cents: 1899,
        });

        let lines = format_product_lines(&[product]);
        assert!(lines[0].contains("Espresso Beans 1kg"));
        assert!(lines[0].contains("BEAN-1"));
        assert!(lines[0].contains("$18.99"));
        assert!(lines[0].contains("v1"));
    }

    #[test]
    fn context_requires_token() {
        let error = Context::resolve("http://localhost:8080".to_string(), None, None).unwrap_err();
        assert!(matches!(error, CliError::Config(_)));
    }
}
