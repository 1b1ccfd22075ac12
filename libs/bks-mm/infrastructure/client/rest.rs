//! REST surface of the Broker Client (C2): order placement/edit/cancel,
//! order status lookup, startup order recovery, and inventory polling.
//!
//! Retry discipline follows SPEC_FULL.md §4.2 with the §9 redesign flag
//! applied: network errors and 5xx retry with backoff
//! `min(3 + 2*attempt, 60)` seconds; 401 surfaces as [`RestError::Unauthorized`]
//! so the caller can re-authorize; other 4xx responses surface as a
//! business rejection and are not retried.

use crate::domain::{Instrument, Inventory, Order, OrderSide, OrderStatus};
use crate::error::RestError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{
    CancelOrderRequest, EditOrderRequest, OrderStatusData, OrderStatusResponse, PlaceOrderRequest,
    PortfolioPosition,
};

const BFF_OPERATIONS: &str = "https://be.broker.ru/trade-api-bff-operations/api/v1";
const BFF_PORTFOLIO: &str = "https://be.broker.ru/trade-api-bff-portfolio/api/v1";
const LIMIT_ORDER_TYPE: &str = "2";

/// Shared access token, read by every REST call and mutated only by the
/// auth rotation path. The single-threaded event loop has multiple task
/// handles pointing at the same `RestClient`, hence the lock rather than
/// plain interior state.
#[derive(Clone)]
pub struct AccessToken(Arc<RwLock<String>>);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(Arc::new(RwLock::new(token)))
    }

    pub fn get(&self) -> String {
        self.0.read().clone()
    }

    pub fn set(&self, token: String) {
        *self.0.write() = token;
    }
}

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    token: AccessToken,
}

fn retry_delay_secs(attempt: u32) -> u64 {
    (3 + 2 * attempt as u64).min(60)
}

impl RestClient {
    pub fn new(timeout: Duration, token: AccessToken) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder should not fail with static config");
        Self { http, token }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token.get())
    }

    /// Runs `op` with indefinite retry on transient failure, per §4.2.
    /// Business/auth failures are returned immediately without retry.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, RestError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, RestError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    let delay = retry_delay_secs(attempt);
                    warn!(attempt, delay, error = %err, "transient REST failure, retrying");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 {
            return Err(RestError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RestError::Business {
            status: status.as_u16(),
            body,
        })
    }

    /// Places a limit order and, on success, returns the freshly minted
    /// [`Order`] in status `New`. I1: a new client order id is minted for
    /// every call, never reused.
    pub async fn place_limit(
        &self,
        instrument: &Instrument,
        side: OrderSide,
        price: f64,
        quantity: u64,
    ) -> Result<Order, RestError> {
        let client_order_id = Uuid::new_v4().to_string();
        self.with_retry(|| async {
            let request = PlaceOrderRequest {
                client_order_id: &client_order_id,
                side: side.as_wire_code(),
                order_type: LIMIT_ORDER_TYPE,
                order_quantity: quantity,
                ticker: &instrument.ticker,
                class_code: &instrument.class_code,
                price: Some(price),
            };
            let response = self
                .http
                .post(format!("{BFF_OPERATIONS}/orders"))
                .header("Authorization", self.auth_header())
                .json(&request)
                .send()
                .await?;
            Self::check_status(response).await?;
            Ok(())
        })
        .await?;

        debug!(id = %client_order_id, ?side, price, quantity, "order placed");
        Ok(Order {
            client_order_id,
            instrument: instrument.clone(),
            side,
            price,
            quantity,
            status: OrderStatus::New,
        })
    }

    /// Cancels a live order with a freshly minted client order id on the
    /// cancel RPC itself (I1).
    pub async fn cancel(&self, client_order_id: &str) -> Result<(), RestError> {
        let cancel_id = Uuid::new_v4().to_string();
        self.with_retry(|| async {
            let request = CancelOrderRequest {
                client_order_id: &cancel_id,
            };
            let response = self
                .http
                .post(format!("{BFF_OPERATIONS}/orders/{client_order_id}/cancel"))
                .header("Authorization", self.auth_header())
                .json(&request)
                .send()
                .await?;
            Self::check_status(response).await?;
            Ok(())
        })
        .await
    }

    /// Edits a live order in place, returning a fresh client order id that
    /// replaces the old one in the Live-Orders Table.
    pub async fn edit(
        &self,
        client_order_id: &str,
        price: f64,
        quantity: u64,
    ) -> Result<String, RestError> {
        let new_id = Uuid::new_v4().to_string();
        self.with_retry(|| async {
            let request = EditOrderRequest {
                client_order_id: &new_id,
                price,
                order_quantity: quantity,
            };
            let response = self
                .http
                .post(format!("{BFF_OPERATIONS}/orders/{client_order_id}"))
                .header("Authorization", self.auth_header())
                .json(&request)
                .send()
                .await?;
            Self::check_status(response).await?;
            Ok(())
        })
        .await?;
        Ok(new_id)
    }

    /// One-shot status lookup, used by the forced refresher.
    pub async fn get_order_status(
        &self,
        client_order_id: &str,
    ) -> Result<(OrderStatus, Option<u64>), RestError> {
        let response = self
            .http
            .get(format!("{BFF_OPERATIONS}/orders/{client_order_id}"))
            .header("Accept", "application/json")
            .header("Authorization", self.auth_header())
            .query(&[("originalClientOrderId", client_order_id)])
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let body: OrderStatusResponse = response
            .json()
            .await
            .map_err(|e| RestError::MalformedResponse(e.to_string()))?;
        let status = OrderStatus::from_broker_code(body.data.order_status).ok_or_else(|| {
            RestError::MalformedResponse(format!("unknown order status code {}", body.data.order_status))
        })?;
        Ok((status, body.data.remained_quantity))
    }

    /// Recovers any still-open orders at startup by searching a wide
    /// datetime window. Supplemented feature per SPEC_FULL.md §10.5: a
    /// crash-and-restart does not orphan orders the in-memory table has
    /// forgotten.
    pub async fn list_active_orders(&self) -> Result<Vec<Order>, RestError> {
        let now = chrono::Utc::now();
        let from = now - chrono::Duration::days(1);
        let to = now + chrono::Duration::days(1);

        let response = self
            .http
            .post(format!("{BFF_OPERATIONS}/orders/search"))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "startDate": from.to_rfc3339(),
                "endDate": to.to_rfc3339(),
            }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let body: Vec<OrderStatusData> = response
            .json()
            .await
            .map_err(|e| RestError::MalformedResponse(e.to_string()))?;

        let mut orders = Vec::new();
        for entry in body {
            let Some(status) = OrderStatus::from_broker_code(entry.order_status) else {
                continue;
            };
            if status.is_terminal() {
                continue;
            }
            let side = match entry.side.as_str() {
                "1" => OrderSide::Bid,
                "0" => OrderSide::Ask,
                other => {
                    warn!(side = other, "unrecognized side code during order recovery, skipping");
                    continue;
                }
            };
            orders.push(Order {
                client_order_id: String::new(),
                instrument: Instrument::new(entry.ticker, entry.class_code),
                side,
                price: entry.price.unwrap_or(0.0),
                quantity: entry.remained_quantity.unwrap_or(entry.order_quantity),
                status,
            });
        }
        Ok(orders)
    }

    /// Polls the portfolio endpoint and builds an [`Inventory`] snapshot.
    /// Preserves the source's "first ticker wins" dedup rule (SPEC_FULL.md
    /// §9 open question) rather than guessing at multi-row semantics.
    pub async fn poll_inventory(&self) -> Result<Inventory, RestError> {
        let response = self
            .http
            .get(format!("{BFF_PORTFOLIO}/portfolio"))
            .header("Accept", "application/json")
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        let positions: Vec<PortfolioPosition> = response
            .json()
            .await
            .map_err(|e| RestError::MalformedResponse(e.to_string()))?;

        let mut inventory = HashMap::new();
        for position in positions {
            inventory.entry(position.ticker).or_insert(position.quantity);
        }
        Ok(Inventory::new(inventory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_formula_matches_spec() {
        assert_eq!(retry_delay_secs(0), 3);
        assert_eq!(retry_delay_secs(1), 5);
        assert_eq!(retry_delay_secs(10), 23);
        assert_eq!(retry_delay_secs(50), 60);
    }
}
