use serde::{Deserialize, Serialize};
use std::fmt;

/// A dish the agent found on a delivery menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub item_name: String,
    pub restaurant_name: String,
    pub price: f64,
    pub url: String,
    #[serde(default)]
    pub image_url: String,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} (${:.2})",
            self.item_name, self.restaurant_name, self.price
        )
    }
}

/// Agent response carrying search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItems {
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

/// What the user asked to have ordered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub restaurant: String,
    pub item: String,
}

impl OrderRequest {
    pub fn new(restaurant: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            restaurant: restaurant.into(),
            item: item.into(),
        }
    }
}

/// Agent response after an order attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderReceipt {
    pub fn is_placed(&self) -> bool {
        matches!(self.status.as_str(), "placed" | "confirmed")
    }
}

/// Job posted to the browser-automation agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentTask<'a> {
    FindLunchOptions,
    SearchMenu { query: &'a str },
    PlaceOrder { restaurant: &'a str, item: &'a str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_menu_items_decode() {
        let body = json!({
            "menu_items": [{
                "item_name": "Pad Thai",
                "restaurant_name": "Thai Basil",
                "price": 14.5,
                "url": "https://example.com/pad-thai"
            }]
        });

        let items: MenuItems = serde_json::from_value(body).unwrap();
        assert_eq!(items.menu_items.len(), 1);
        assert_eq!(items.menu_items[0].image_url, "");
        assert_eq!(
            items.menu_items[0].to_string(),
            "Pad Thai from Thai Basil ($14.50)"
        );
    }

    #[test]
    fn test_agent_task_shape() {
        let task = AgentTask::PlaceOrder {
            restaurant: "Thai Basil",
            item: "Pad Thai",
        };
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({"kind": "place_order", "restaurant": "Thai Basil", "item": "Pad Thai"})
        );
        assert_eq!(
            serde_json::to_value(AgentTask::FindLunchOptions).unwrap(),
            json!({"kind": "find_lunch_options"})
        );
    }

    #[test]
    fn test_receipt_status() {
        let receipt: OrderReceipt =
            serde_json::from_value(json!({"status": "placed", "order_id": "A1"})).unwrap();
        assert!(receipt.is_placed());
        assert!(!OrderReceipt {
            status: "rejected".to_string(),
            ..Default::default()
        }
        .is_placed());
    }
}
