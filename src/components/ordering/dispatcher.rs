use super::agent::MenuOrderService;
use super::models::OrderRequest;
use crate::components::notifier::{events, NotificationPayload, NotificationSink};
use rust_i18n::t;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Hands orders to the service without making the caller wait
#[derive(Clone)]
pub struct OrderDispatcher {
    service: Arc<dyn MenuOrderService>,
    sink: Arc<dyn NotificationSink>,
}

impl OrderDispatcher {
    pub fn new(service: Arc<dyn MenuOrderService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { service, sink }
    }

    pub fn service(&self) -> Arc<dyn MenuOrderService> {
        Arc::clone(&self.service)
    }

    /// Start the order in the background. The returned handle is only
    /// useful to tests; callers acknowledge the user right away.
    pub fn dispatch(&self, user_id: &str, request: OrderRequest) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let user_id = user_id.to_string();

        info!(
            "Dispatching order of {} from {} for {}",
            request.item, request.restaurant, user_id
        );

        tokio::spawn(async move {
            match service.place_order(&request).await {
                Ok(receipt) => {
                    let message = t!(
                        "order_placed",
                        item = request.item.as_str(),
                        restaurant = request.restaurant.as_str(),
                        order_id = receipt.order_id.as_deref().unwrap_or("-")
                    );
                    sink.emit(
                        events::ORDER_PLACED,
                        NotificationPayload::new(&user_id, message),
                        &user_id,
                    );
                }
                Err(e) => {
                    error!("Order for {} failed: {}", user_id, e);
                    sink.emit(
                        events::ORDER_FAILED,
                        NotificationPayload::new(&user_id, t!("order_failed")),
                        &user_id,
                    );
                }
            }
        })
    }
}
