//! Periodic removal of guardians whose customer has come of age.
//!
//! Every `interval` the sweeper loads the customers that still reference a
//! guardian and, for each one that is 18 or older, deletes the guardian row
//! and clears the reference in a single transaction. A customer that fails is
//! logged and counted; the pass carries on with the rest.
//!
//! When the customer list itself cannot be loaded the next attempt is made
//! after `retry_base`, doubling per consecutive failure up to `interval`.
//!
//! The sweeper assumes a single running instance. Two processes sweeping the
//! same database would race on the same rows harmlessly but log spurious
//! failures.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{
        Guardians,
        customers::{self, Entity as Customers},
        guardians,
    },
    rules,
};

pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(30);

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub removed: usize,
    pub failed: usize,
}

pub struct GuardianSweeper {
    orm: OrmConn,
    interval: Duration,
    retry_base: Duration,
}

impl GuardianSweeper {
    pub fn new(orm: OrmConn, interval: Duration) -> Self {
        Self {
            orm,
            interval,
            retry_base: DEFAULT_RETRY_BASE.min(interval),
        }
    }

    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    /// Runs sweeps until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "guardian sweeper starting"
        );

        let mut failures: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let wait = match self.sweep_once(Local::now().date_naive()).await {
                Ok(report) => {
                    failures = 0;
                    info!(
                        examined = report.examined,
                        removed = report.removed,
                        failed = report.failed,
                        "guardian sweep finished"
                    );
                    self.interval
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let wait = backoff(self.retry_base, self.interval, failures);
                    error!(
                        error = %err,
                        attempt = failures,
                        retry_in_secs = wait.as_secs(),
                        "guardian sweep could not load customers"
                    );
                    wait
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = shutdown.cancelled() => break,
            }
        }

        info!("guardian sweeper shutting down");
    }

    /// One pass over every customer that still has a guardian, as of `today`.
    pub async fn sweep_once(&self, today: NaiveDate) -> Result<SweepReport, sea_orm::DbErr> {
        let candidates = Customers::find()
            .filter(customers::Column::GuardianId.is_not_null())
            .all(&self.orm)
            .await?;

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for customer in candidates {
            if !rules::guardian_removable(customer.birth_date, customer.guardian_id, today) {
                continue;
            }
            let customer_id = customer.id;
            match self.remove_guardian(customer).await {
                Ok(()) => {
                    report.removed += 1;
                    debug!(%customer_id, "guardian removed");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(%customer_id, error = %err, "guardian removal failed");
                }
            }
        }

        Ok(report)
    }

    async fn remove_guardian(&self, customer: customers::Model) -> Result<(), sea_orm::DbErr> {
        let customer_id: Uuid = customer.id;
        let txn = self.orm.begin().await?;
        Guardians::delete_many()
            .filter(guardians::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;
        let mut active: customers::ActiveModel = customer.into();
        active.guardian_id = Set(None);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&txn).await?;
        txn.commit().await
    }
}

/// `base * 2^(failures - 1)`, capped at `cap`.
fn backoff(base: Duration, cap: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}
