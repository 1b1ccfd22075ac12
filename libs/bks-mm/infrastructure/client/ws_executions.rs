//! Executions WebSocket feed (C2): applies execution reports to the
//! Live-Orders Table as they arrive.
//!
//! SPEC_FULL.md §9 preserves an open question from the source material:
//! this socket is commented as possibly non-functional upstream. The
//! feed is still implemented in full, but [`crate::live_orders::LiveOrdersTable`]
//! correctness never depends on it arriving — the forced refresher in
//! `order_manager` is the authoritative path regardless of whether this
//! feed delivers anything.

use crate::domain::OrderStatus;
use crate::error::WsError;
use crate::live_orders::LiveOrdersTable;
use async_trait::async_trait;
use hypersockets::{
    ExponentialBackoff, HeaderProvider, Headers, HyperSocketError, MessageHandler, MessageRouter,
    Result as HsResult, WsMessage,
};
use std::time::Duration;
use tracing::{debug, warn};

use super::rest::AccessToken;
use super::types::ExecutionReport;

const EXECUTIONS_WS_URL: &str = "wss://ws.broker.ru/trade-api-bff-operations/api/v1/executions/ws";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Route {
    Execution,
}

struct ExecutionsRouter;

#[async_trait]
impl MessageRouter for ExecutionsRouter {
    type Message = ExecutionReport;
    type RouteKey = Route;

    async fn parse(&self, message: WsMessage) -> HsResult<Self::Message> {
        let WsMessage::Text(text) = message else {
            return Err(HyperSocketError::ParseError("expected text frame".into()));
        };
        serde_json::from_str(&text).map_err(|e| HyperSocketError::ParseError(e.to_string()))
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        Route::Execution
    }
}

struct ExecutionsHandler {
    table: LiveOrdersTable,
}

impl MessageHandler<ExecutionReport> for ExecutionsHandler {
    fn handle(&mut self, report: ExecutionReport) -> HsResult<()> {
        match OrderStatus::from_broker_code(report.data.order_status) {
            Some(status) => {
                debug!(id = %report.client_order_id, ?status, "execution report applied");
                self.table
                    .apply_status(&report.client_order_id, status, report.data.remained_quantity);
            }
            None => {
                warn!(
                    id = %report.client_order_id,
                    code = report.data.order_status,
                    "unrecognized order status code, dropping report"
                );
            }
        }
        Ok(())
    }
}

struct BearerHeaders {
    token: AccessToken,
}

#[async_trait]
impl HeaderProvider for BearerHeaders {
    async fn get_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", self.token.get()));
        headers
    }
}

pub async fn run_executions_feed(token: AccessToken, table: LiveOrdersTable) -> Result<(), WsError> {
    let client = hypersockets::builder()
        .url(EXECUTIONS_WS_URL)
        .router(ExecutionsRouter, move |routing| {
            routing.handler(Route::Execution, ExecutionsHandler { table })
        })
        .headers(BearerHeaders { token })
        .reconnect_strategy(ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            None,
        ))
        .build()
        .await
        .map_err(WsError::Transport)?;

    std::future::pending::<()>().await;
    drop(client);
    Ok(())
}
