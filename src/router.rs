//! Smart Router
//!
//! The facade a front end talks to. It holds the current swap intent,
//! re-quotes it on the debounce/refresh schedule and publishes the latest
//! committed cycle as a [`RouterSnapshot`]: best route, all routes, loading
//! flag and error. Swap execution always uses the route and amount of that
//! snapshot, never a half-finished cycle.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::brain::RouteQuote;
use crate::cartographer::KnownPools;
use crate::chain::ChainClient;
use crate::config::QuoteLog;
use crate::contracts::ContractRegistry;
use crate::engine::{CycleOutcome, RouteEngine, SwapIntent};
use crate::error::{RegistryError, Result, RouterError};
use crate::executor::{SwapExecutor, SwapState};
use crate::scheduler::{
    CycleRunner, CycleTicket, RefreshScheduler, DEFAULT_DEBOUNCE, DEFAULT_REFRESH_INTERVAL,
};
use crate::tokens::Token;

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub debounce: Duration,
    pub refresh_interval: Duration,
    /// JSONL file receiving every committed cycle
    pub quote_log: Option<PathBuf>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            quote_log: None,
        }
    }
}

/// Latest committed state, as shown to the user
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouterSnapshot {
    /// Generation of the cycle that produced these results
    pub generation: u64,
    pub amount_in: Option<U256>,
    pub best_route: Option<RouteQuote>,
    pub all_routes: Vec<RouteQuote>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

struct RouterCore {
    engine: RouteEngine,
    executor: SwapExecutor,
    bridges: Vec<Token>,
    intent: RwLock<Option<SwapIntent>>,
    snapshot: RwLock<RouterSnapshot>,
    quote_log: Option<PathBuf>,
}

impl RouterCore {
    fn intent(&self) -> RwLockReadGuard<'_, Option<SwapIntent>> {
        self.intent.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn intent_mut(&self) -> RwLockWriteGuard<'_, Option<SwapIntent>> {
        self.intent.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> RwLockReadGuard<'_, RouterSnapshot> {
        self.snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot_mut(&self) -> RwLockWriteGuard<'_, RouterSnapshot> {
        self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Quote the current intent and commit the result if `ticket` is still
    /// current. Returns the cycle result either way.
    async fn quote_cycle(&self, ticket: &CycleTicket) -> Result<CycleOutcome> {
        let intent = self.intent().clone().ok_or(RouterError::NoIntent)?;

        {
            let mut snapshot = self.snapshot_mut();
            if !ticket.is_current() {
                return Err(RouterError::Superseded);
            }
            snapshot.is_loading = true;
        }
        self.executor.begin_quoting();

        let result = self.engine.run_cycle(&intent, &self.bridges).await;

        let log = {
            let mut snapshot = self.snapshot_mut();
            if !ticket.is_current() {
                debug!("Discarding results of superseded generation {}", ticket.generation());
                return Err(RouterError::Superseded);
            }

            snapshot.generation = ticket.generation();
            snapshot.is_loading = false;
            snapshot.updated_at = Some(Utc::now());

            match &result {
                Ok(outcome) => {
                    self.executor.finish_quoting(outcome.best_route.is_some());
                    snapshot.amount_in = Some(outcome.amount_in);
                    snapshot.all_routes = outcome.all_routes.clone();
                    snapshot.best_route = outcome.best_route.clone();
                    snapshot.error = outcome
                        .best_route
                        .is_none()
                        .then(|| RouterError::NoRoutes.to_string());
                    self.quote_log.as_ref().map(|path| {
                        (
                            path.clone(),
                            QuoteLog::from_outcome(&intent.input_token, &intent.output_token, outcome),
                        )
                    })
                }
                Err(e) => {
                    warn!("Routing cycle failed: {}", e);
                    self.executor.finish_quoting(false);
                    snapshot.amount_in = None;
                    snapshot.all_routes.clear();
                    snapshot.best_route = None;
                    snapshot.error = Some(e.to_string());
                    None
                }
            }
        };

        if let Some((path, entry)) = log {
            if let Err(e) = entry.append_to_file(&path) {
                warn!("Failed to write quote log {}: {}", path.display(), e);
            }
        }

        result
    }
}

#[async_trait]
impl CycleRunner for RouterCore {
    async fn run_cycle(&self, ticket: CycleTicket) {
        // Outcome and errors are already published in the snapshot
        let _ = self.quote_cycle(&ticket).await;
    }
}

/// Debounced, self-refreshing router for one chain
pub struct SmartRouter {
    client: Arc<dyn ChainClient>,
    core: Arc<RouterCore>,
    scheduler: RefreshScheduler<RouterCore>,
}

impl SmartRouter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
        known_pools: KnownPools,
        bridges: Vec<Token>,
        settings: RouterSettings,
    ) -> std::result::Result<Self, RegistryError> {
        let core = Arc::new(RouterCore {
            engine: RouteEngine::new(client.clone(), chain_id, contracts, known_pools)?,
            executor: SwapExecutor::new(client.clone(), chain_id, contracts)?,
            bridges,
            intent: RwLock::new(None),
            snapshot: RwLock::new(RouterSnapshot::default()),
            quote_log: settings.quote_log,
        });
        let scheduler =
            RefreshScheduler::new(core.clone(), settings.debounce, settings.refresh_interval);

        info!(
            "Smart router ready on chain {} ({} bridge tokens)",
            chain_id,
            core.bridges.len()
        );
        Ok(Self {
            client,
            core,
            scheduler,
        })
    }

    pub fn snapshot(&self) -> RouterSnapshot {
        self.core.snapshot().clone()
    }

    pub fn intent(&self) -> Option<SwapIntent> {
        self.core.intent().clone()
    }

    pub fn swap_state(&self) -> SwapState {
        self.core.executor.state()
    }

    /// Replace the intent. A change of tokens or amount supersedes any
    /// running cycle and starts a new debounce; slippage and deadline
    /// changes apply to the next swap without re-quoting.
    pub fn set_intent(&self, intent: SwapIntent) {
        // Snapshot lock first: a cycle commits under the same lock, so it
        // either lands before the bump or sees itself superseded.
        let mut snapshot = self.core.snapshot_mut();
        let mut current = self.core.intent_mut();

        let changed = !current
            .as_ref()
            .is_some_and(|existing| existing.same_trade(&intent));
        *current = Some(intent);
        drop(current);

        if changed {
            let generation = self.scheduler.schedule();
            snapshot.is_loading = true;
            snapshot.error = None;
            debug!("Intent changed, generation {} scheduled", generation);
        }
    }

    /// Drop the intent and stop all quoting
    pub fn clear_intent(&self) {
        let mut snapshot = self.core.snapshot_mut();
        self.scheduler.cancel();
        *self.core.intent_mut() = None;
        *snapshot = RouterSnapshot::default();
        self.core.executor.finish_quoting(false);
    }

    /// Re-quote right away, restarting the refresh period
    pub fn refresh(&self) {
        let mut snapshot = self.core.snapshot_mut();
        if self.core.intent().is_none() {
            return;
        }
        self.scheduler.refresh_now();
        snapshot.is_loading = true;
    }

    /// Set `intent` and quote it immediately, bypassing the debounce.
    /// Timed cycles stay stopped until the next [`SmartRouter::set_intent`]
    /// or [`SmartRouter::refresh`].
    pub async fn quote_once(&self, intent: SwapIntent) -> Result<CycleOutcome> {
        let ticket = {
            let _snapshot = self.core.snapshot_mut();
            *self.core.intent_mut() = Some(intent);
            self.scheduler.claim()
        };

        let outcome = self.core.quote_cycle(&ticket).await?;
        if outcome.best_route.is_none() {
            return Err(RouterError::NoRoutes);
        }
        Ok(outcome)
    }

    /// Execute the best route of the latest snapshot.
    ///
    /// Not idempotent: every successful call submits a transaction.
    pub async fn execute_swap(&self, slippage_pct: f64) -> Result<B256> {
        let (best_route, amount_in) = {
            let snapshot = self.core.snapshot();
            (snapshot.best_route.clone(), snapshot.amount_in)
        };
        let deadline_minutes = self
            .core
            .intent()
            .as_ref()
            .map(|intent| intent.deadline_minutes)
            .ok_or(RouterError::NoIntent)?;

        self.core
            .executor
            .execute(
                best_route.as_ref(),
                amount_in.unwrap_or_default(),
                slippage_pct,
                deadline_minutes,
            )
            .await
    }

    /// Execute with the intent's own slippage tolerance
    pub async fn execute_with_intent_slippage(&self) -> Result<B256> {
        let slippage_pct = self
            .core
            .intent()
            .as_ref()
            .map(|intent| intent.slippage_pct)
            .ok_or(RouterError::NoIntent)?;
        self.execute_swap(slippage_pct).await
    }

    /// Allowance shortfall of the connected account for the current intent
    pub async fn check_approval(&self) -> Result<Option<U256>> {
        let owner = self.account()?;
        let intent = self.intent().ok_or(RouterError::NoIntent)?;
        let amount_in = intent.amount_in()?;
        self.core
            .executor
            .check_approval(&intent.input_token, owner, amount_in)
            .await
    }

    /// Approve the smart router for `amount` of the intent's input token
    pub async fn approve(&self, amount: U256) -> Result<B256> {
        let intent = self.intent().ok_or(RouterError::NoIntent)?;
        self.core.executor.approve(&intent.input_token, amount).await
    }

    pub async fn poll_confirmation(&self) -> Result<SwapState> {
        self.core.executor.poll_confirmation().await
    }

    fn account(&self) -> Result<Address> {
        self.client.account().ok_or(RouterError::NotConnected)
    }
}
