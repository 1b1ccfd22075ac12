//! Supervisor (C7): starts every long-running task, holds the process up
//! while they run, and on shutdown best-effort cancels every resting
//! order before exiting.

use crate::config::EngineConfig;
use crate::domain::Instrument;
use crate::error::FatalError;
use crate::infrastructure::client::BrokerClient;
use crate::infrastructure::{auth, ShutdownManager};
use crate::live_orders::LiveOrdersTable;
use crate::{bus::EventBus, order_manager, strategy};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Supervisor {
    config: EngineConfig,
}

impl Supervisor {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Authorizes, starts every component, and blocks until shutdown is
    /// triggered (SIGINT) or a supervised task fails fatally.
    pub async fn run(self) -> Result<(), FatalError> {
        let instrument = Instrument::new(
            self.config.instrument.ticker.clone(),
            self.config.instrument.class_code.clone(),
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timing.rest_timeout_secs))
            .build()
            .expect("reqwest client builder should not fail with static config");

        info!("authorizing with identity provider");
        let access_token = auth::obtain_access_token(&http, &self.config.refresh_token).await?;

        let broker = BrokerClient::new(
            access_token,
            Duration::from_secs(self.config.timing.rest_timeout_secs),
        );

        let live_orders = LiveOrdersTable::new();
        match broker.list_active_orders().await {
            Ok(orders) => {
                info!(count = orders.len(), "recovered live orders from broker");
                live_orders.hydrate(orders);
            }
            Err(e) => warn!(error = %e, "failed to recover live orders at startup, starting with an empty table"),
        }

        let bus = EventBus::new();
        let (target_tx, target_rx) = tokio::sync::watch::channel(None);

        let shutdown = ShutdownManager::new();
        shutdown.spawn_signal_handler();

        let order_book_task = tokio::spawn({
            let broker = broker.clone();
            let instrument = instrument.clone();
            let depth = self.config.instrument.depth;
            let tx = bus.book_sender();
            async move {
                if let Err(e) = broker.subscribe_order_book(instrument, depth, tx).await {
                    error!(error = %e, "order book feed terminated");
                }
            }
        });

        let executions_task = tokio::spawn({
            let broker = broker.clone();
            let table = live_orders.clone();
            async move {
                if let Err(e) = broker.subscribe_executions(table).await {
                    error!(error = %e, "executions feed terminated");
                }
            }
        });

        let inventory_task = tokio::spawn({
            let broker = broker.clone();
            let tx = bus.inventory_sender();
            let period = Duration::from_secs(self.config.timing.inventory_poll_secs);
            async move {
                broker.inventory_refresher(period, tx).await;
            }
        });

        let strategy_task = tokio::spawn(strategy::run(
            instrument.clone(),
            self.config.strategy.clone(),
            bus.book_receiver(),
            bus.inventory_receiver(),
            live_orders.clone(),
            target_tx,
        ));

        let order_manager_task = tokio::spawn(order_manager::run(
            broker.clone(),
            live_orders.clone(),
            self.config.strategy.clone(),
            target_rx,
            Duration::from_secs(self.config.timing.reconciliation_pacing_secs),
        ));

        let forced_refresher_task = tokio::spawn(order_manager::run_forced_refresher(
            broker.clone(),
            live_orders.clone(),
            Duration::from_secs(self.config.timing.forced_refresh_secs),
        ));

        while shutdown.is_running() {
            shutdown.interruptible_sleep(Duration::from_secs(1)).await;
        }

        info!("shutting down, cancelling resting orders best-effort");
        order_book_task.abort();
        executions_task.abort();
        inventory_task.abort();
        strategy_task.abort();
        order_manager_task.abort();
        forced_refresher_task.abort();

        let cancel_all = async {
            for order in live_orders.all_orders() {
                if let Err(e) = broker.cancel(&order.client_order_id).await {
                    warn!(id = %order.client_order_id, error = %e, "best-effort cancel failed during shutdown");
                }
            }
        };
        if tokio::time::timeout(Duration::from_secs(10), cancel_all).await.is_err() {
            warn!("shutdown cancel-all timed out, exiting anyway");
        }

        info!("shutdown complete");
        Ok(())
    }
}
