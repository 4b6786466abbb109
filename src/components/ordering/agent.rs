use super::models::{AgentTask, MenuItem, MenuItems, OrderReceipt, OrderRequest};
use crate::error::{order_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Finds food and places orders on the user's behalf
#[async_trait]
pub trait MenuOrderService: Send + Sync {
    /// Popular picks for a quick lunch
    async fn find_lunch_options(&self) -> BotResult<Vec<MenuItem>>;

    async fn search_menu(&self, query: &str) -> BotResult<Vec<MenuItem>>;

    async fn place_order(&self, request: &OrderRequest) -> BotResult<OrderReceipt>;
}

/// Talks to the browser-automation agent over HTTP
#[derive(Clone)]
pub struct BrowserAgentClient {
    client: Client,
    base_url: String,
}

impl BrowserAgentClient {
    pub fn new(base_url: impl Into<String>) -> BotResult<Self> {
        // Browser runs take minutes, not seconds
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn run_task<T: DeserializeOwned>(&self, task: &AgentTask<'_>) -> BotResult<T> {
        let url = format!("{}/tasks", self.base_url);
        debug!("Posting agent task {:?} to {}", task, url);

        let response = self.client.post(&url).json(task).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(order_error(&format!(
                "Agent returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MenuOrderService for BrowserAgentClient {
    async fn find_lunch_options(&self) -> BotResult<Vec<MenuItem>> {
        let items: MenuItems = self.run_task(&AgentTask::FindLunchOptions).await?;
        Ok(items.menu_items)
    }

    async fn search_menu(&self, query: &str) -> BotResult<Vec<MenuItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(order_error("Search query is empty"));
        }
        let items: MenuItems = self.run_task(&AgentTask::SearchMenu { query }).await?;
        Ok(items.menu_items)
    }

    async fn place_order(&self, request: &OrderRequest) -> BotResult<OrderReceipt> {
        info!("Placing order for {} from {}", request.item, request.restaurant);
        let receipt: OrderReceipt = self
            .run_task(&AgentTask::PlaceOrder {
                restaurant: &request.restaurant,
                item: &request.item,
            })
            .await?;

        if !receipt.is_placed() {
            return Err(order_error(&format!(
                "Order was not placed (status: {})",
                receipt.status
            )));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_menu_posts_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(json!({"kind": "search_menu", "query": "ramen"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "menu_items": [{
                    "item_name": "Tonkotsu",
                    "restaurant_name": "Ramen Bar",
                    "price": 16.0,
                    "url": "https://example.com/tonkotsu",
                    "image_url": "https://example.com/tonkotsu.png"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BrowserAgentClient::new(format!("{}/", server.uri())).unwrap();
        let items = client.search_menu("  ramen ").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].restaurant_name, "Ramen Bar");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected_locally() {
        let server = MockServer::start().await;
        let client = BrowserAgentClient::new(server.uri()).unwrap();
        assert!(client.search_menu("   ").await.is_err());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("browser crashed"))
            .mount(&server)
            .await;

        let client = BrowserAgentClient::new(server.uri()).unwrap();
        let err = client.find_lunch_options().await.unwrap_err();
        assert!(err.to_string().contains("browser crashed"));
    }

    #[tokio::test]
    async fn test_rejected_order_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "out_of_stock"})),
            )
            .mount(&server)
            .await;

        let client = BrowserAgentClient::new(server.uri()).unwrap();
        let result = client
            .place_order(&OrderRequest::new("Ramen Bar", "Tonkotsu"))
            .await;
        assert!(result.is_err());
    }
}
