//! Stock-take orchestration
//!
//! `take_stock` as the caller sees it: submission acquires the account's
//! mutual-exclusion marker and spawns the reconciliation as a background
//! task, returning immediately with a handle whose completion channel
//! reports the eventual result. The lock is released exactly once on every
//! path, after the post-commit reporting step, whatever that step did.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::{Config, StockTakeConfig};
use crate::error::{AppError, AppResult};
use crate::external::MailApiClient;
use crate::services::{
    NotificationService, StockLineService, StockTakeOutcome, StockTakeService, UserService,
};
use shared::report::{render_grand_report, render_line_report};

/// Per-account mutual exclusion for reconciliations.
///
/// Single-process semantics are assumed for the ledger, so an in-memory
/// registry is sufficient: one account can never have two stock takes in
/// flight, while distinct accounts proceed independently.
#[derive(Clone, Default)]
pub struct AccountLocks {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the account. Returns false when a stock take already holds it.
    pub fn try_acquire(&self, owner_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(owner_id)
    }

    /// Release the account. Returns false when the marker was not held,
    /// which callers must treat as an alerting condition.
    pub fn release(&self, owner_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&owner_id)
    }

    pub fn is_locked(&self, owner_id: Uuid) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&owner_id)
    }
}

/// What one stock-take job ultimately did.
#[derive(Debug, Clone)]
pub struct TakeStockResult {
    pub owner_id: Uuid,
    pub success: bool,
    pub stock_take_id: Option<Uuid>,
    pub attempts: u32,
    pub reports_sent: usize,
    pub lock_released: bool,
}

/// Handle returned at submission: the job runs out-of-band, the handle's
/// completion channel delivers the [`TakeStockResult`] when it finishes.
pub struct JobHandle {
    pub owner_id: Uuid,
    completion: oneshot::Receiver<TakeStockResult>,
}

impl JobHandle {
    /// Wait for the job to finish. `None` when the worker was torn down
    /// before the job completed.
    pub async fn join(self) -> Option<TakeStockResult> {
        self.completion.await.ok()
    }
}

/// The stock-take job runner.
#[derive(Clone)]
pub struct StockTakeJobs {
    locks: AccountLocks,
    stock_takes: StockTakeService,
    stock_lines: StockLineService,
    users: UserService,
    notifier: NotificationService,
    job_config: StockTakeConfig,
    currency_symbol: String,
}

impl StockTakeJobs {
    /// Wire up a runner from the shared pool and configuration.
    pub fn new(db: PgPool, config: &Config) -> Self {
        let users = UserService::new(db.clone());
        let notifier = NotificationService::new(
            users.clone(),
            config.notifications.settings(),
            MailApiClient::from_config(&config.mail),
            config.report.currency_symbol.clone(),
        );
        Self {
            locks: AccountLocks::new(),
            stock_takes: StockTakeService::new(db.clone()),
            stock_lines: StockLineService::new(db),
            users,
            notifier,
            job_config: config.stock_take.clone(),
            currency_symbol: config.report.currency_symbol.clone(),
        }
    }

    /// Submit a stock take for one account.
    ///
    /// Rejected immediately when the account holds no stock or already has a
    /// reconciliation in flight; otherwise the caller gets a handle straight
    /// back and the work happens out-of-band.
    pub async fn submit(&self, owner_id: Uuid) -> AppResult<JobHandle> {
        if !self.stock_lines.has_stock(owner_id).await? {
            return Err(AppError::Validation {
                field: "owner_id".to_string(),
                message: "account holds no stock lines".to_string(),
            });
        }

        if !self.locks.try_acquire(owner_id) {
            return Err(AppError::AccountLocked(owner_id));
        }

        let (done_tx, done_rx) = oneshot::channel();
        let job = self.clone();
        tokio::spawn(async move {
            job.run(owner_id, done_tx).await;
        });

        Ok(JobHandle {
            owner_id,
            completion: done_rx,
        })
    }

    async fn run(self, owner_id: Uuid, done: oneshot::Sender<TakeStockResult>) {
        let timeout = Duration::from_secs(self.job_config.job_timeout_secs);
        let max_attempts = self.job_config.job_attempts.max(1);

        let mut attempts = 0;
        let mut outcome: Option<StockTakeOutcome> = None;
        while attempts < max_attempts && outcome.is_none() {
            attempts += 1;
            // Each attempt is a fresh transaction; the transaction itself is
            // never retried internally.
            match tokio::time::timeout(timeout, self.stock_takes.reconcile(owner_id)).await {
                Ok(Ok(result)) => outcome = Some(result),
                Ok(Err(e)) => {
                    tracing::error!(
                        %owner_id,
                        attempt = attempts,
                        error = %e,
                        "an error occurred during the stock taking process"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        %owner_id,
                        attempt = attempts,
                        timeout_secs = self.job_config.job_timeout_secs,
                        "stock take attempt timed out"
                    );
                }
            }
        }

        let mut reports_sent = 0;
        if let Some(committed) = &outcome {
            reports_sent = self.dispatch_reports(committed).await;
        }

        // Released exactly once, whatever happened above. A missing marker
        // here means the account could have been stuck: alert loudly.
        let lock_released = self.locks.release(owner_id);
        if !lock_released {
            tracing::error!(%owner_id, "account lock marker missing at release");
        }

        let result = TakeStockResult {
            owner_id,
            success: outcome.is_some(),
            stock_take_id: outcome.as_ref().map(|o| o.stock_take_id),
            attempts,
            reports_sent,
            lock_released,
        };

        if done.send(result).is_err() {
            tracing::debug!(%owner_id, "stock take completion receiver dropped");
        }
    }

    /// Post-commit reporting step. Failures here are logged and reflected
    /// in the result, but the committed stock take stands.
    async fn dispatch_reports(&self, outcome: &StockTakeOutcome) -> usize {
        let requester = match self.users.get(outcome.owner_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(
                    owner_id = %outcome.owner_id,
                    error = %e,
                    "could not resolve account owner for report dispatch"
                );
                return 0;
            }
        };

        let line_report = render_line_report(
            &requester.username,
            outcome.taken_at,
            &outcome.reckonings,
            &self.currency_symbol,
        );
        let grand_report = render_grand_report(
            &requester.username,
            outcome.taken_at,
            &outcome.grand,
            &self.currency_symbol,
        );

        match self
            .notifier
            .dispatch_stock_take_reports(&requester, &[line_report, grand_report])
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(
                    owner_id = %outcome.owner_id,
                    error = %e,
                    "stock take report dispatch failed"
                );
                0
            }
        }
    }
}
