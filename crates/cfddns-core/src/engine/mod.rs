//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Resolving the current public address via the AddressResolver
//! - Fetching the authoritative record from the RecordStore
//! - Deciding whether a mutation is needed
//! - Creating or updating the record
//! - Reporting the outcome through logs and the Notifier
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │  Reconciler  │
//!                     └──────────────┘
//!                             │
//!         ┌───────────────────┼───────────────────┐
//!         │                   │                   │
//!         ▼                   ▼                   ▼
//! ┌───────────────┐   ┌──────────────┐    ┌─────────────┐
//! │AddressResolver│   │ RecordStore  │    │  Notifier   │
//! │ (desired IP)  │   │(current, set)│    │  (report)   │
//! └───────────────┘   └──────────────┘    └─────────────┘
//! ```
//!
//! ## Pass Flow (per family)
//!
//! 1. Resolving: resolve the public address; on failure report and stop
//! 2. Fetching: fetch the record; on error report and stop
//! 3. Record absent: create it if allowed, otherwise report failure
//! 4. Content equal: nothing to do
//! 5. Content differs: update with the full record body
//! 6. Reported: log, and notify unless the outcome is `Unchanged`
//!
//! Families run one after another and never share failure state.

use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::resolver::{AddressResolver, ResolvedAddress};
use crate::traits::{AddressFamily, Notifier, RecordSnapshot, RecordStore};

/// Immutable reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Record name kept in sync
    pub record_name: String,
    /// Families reconciled by each pass, in order
    pub families: Vec<AddressFamily>,
    /// Create the record when the provider has none
    pub add_if_missing: bool,
    /// Send notifications for reported outcomes
    pub notify: bool,
}

/// Step of the per-family state machine that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Public address could not be resolved
    Resolve,
    /// Record could not be fetched
    Fetch,
    /// Record does not exist and creation is not allowed
    Missing,
    /// Record creation failed
    Create,
    /// Record update failed
    Update,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Resolve => "resolve",
            FailureStage::Fetch => "fetch",
            FailureStage::Missing => "missing",
            FailureStage::Create => "create",
            FailureStage::Update => "update",
        };
        f.write_str(name)
    }
}

/// Result of reconciling one family in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record already had the desired content
    Unchanged {
        /// The current content
        content: String,
    },
    /// Record content was replaced
    Updated {
        /// Content before the update
        previous: String,
        /// Content after the update
        new: String,
    },
    /// Record did not exist and was created
    Created {
        /// Content of the new record
        new: String,
    },
    /// The family's sub-pass failed
    Failed {
        /// Where it failed
        stage: FailureStage,
        /// Why it failed
        reason: String,
    },
}

impl ReconcileOutcome {
    fn failed(stage: FailureStage, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            reason: reason.into(),
        }
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether this outcome changed the record
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Updated { .. } | Self::Created { .. })
    }

    /// Operator-facing description of this outcome
    pub fn describe(&self, family: AddressFamily, record_name: &str) -> String {
        match self {
            Self::Unchanged { content } => format!(
                "{} DNS record for {} is already {}, no update needed.",
                family, record_name, content
            ),
            Self::Updated { previous, new } => format!(
                "{} DNS record for {} updated from {} to {} successfully.",
                family, record_name, previous, new
            ),
            Self::Created { new } => format!(
                "{} DNS record for {} created with {} successfully.",
                family, record_name, new
            ),
            Self::Failed { stage, reason } => format!(
                "{} DNS record for {} failed ({}): {}",
                family, record_name, stage, reason
            ),
        }
    }
}

/// Outcomes of one reconciliation pass
#[derive(Debug, Clone)]
pub struct PassReport {
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Outcome per family, in processing order
    pub outcomes: Vec<(AddressFamily, ReconcileOutcome)>,
}

impl PassReport {
    /// Whether any family failed
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| outcome.is_failure())
    }

    /// Outcome for `family`, if it was part of the pass
    pub fn outcome(&self, family: AddressFamily) -> Option<&ReconcileOutcome> {
        self.outcomes
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, outcome)| outcome)
    }
}

/// Core reconciliation engine
///
/// Owns its collaborators and an immutable copy of the settings. Every
/// method is sequential: no two provider calls are ever in flight at once.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Either call [`Reconciler::run_pass()`] once, or
/// 3. Loop with [`Reconciler::run_with_shutdown()`] until the shutdown future resolves
pub struct Reconciler {
    /// Desired-state source
    resolver: AddressResolver,

    /// Current-state source and mutation target
    store: Box<dyn RecordStore>,

    /// Outcome sink
    notifier: Box<dyn Notifier>,

    /// Immutable settings
    settings: ReconcileSettings,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If no record name or no family is configured
    pub fn new(
        resolver: AddressResolver,
        store: Box<dyn RecordStore>,
        notifier: Box<dyn Notifier>,
        settings: ReconcileSettings,
    ) -> Result<Self> {
        if settings.record_name.trim().is_empty() {
            return Err(Error::config("Record name cannot be empty"));
        }
        if settings.families.is_empty() {
            return Err(Error::config("No address families configured"));
        }

        Ok(Self {
            resolver,
            store,
            notifier,
            settings,
        })
    }

    /// The settings this reconciler was built with
    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Run one reconciliation pass over every configured family
    pub async fn run_pass(&self) -> PassReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.settings.families.len());

        for &family in &self.settings.families {
            let outcome = self.reconcile_family(family).await;
            self.report(family, &outcome).await;
            outcomes.push((family, outcome));
        }

        PassReport {
            started_at,
            outcomes,
        }
    }

    /// Resolve, fetch, compare and mutate one family
    ///
    /// Does not log or notify the final outcome; [`run_pass`](Self::run_pass)
    /// does that in its reporting step.
    pub async fn reconcile_family(&self, family: AddressFamily) -> ReconcileOutcome {
        debug!("Reconciling {} record for {}", family, self.settings.record_name);

        let desired = match self.resolver.resolve(family).await {
            Ok(address) => address,
            Err(e) => return ReconcileOutcome::failed(FailureStage::Resolve, e.to_string()),
        };

        let current = match self.fetch(family).await {
            Ok(current) => current,
            Err(e) => return self.store_failure(FailureStage::Fetch, e),
        };

        match current {
            Some(record) if record.content.trim() == desired.as_str() => {
                ReconcileOutcome::Unchanged {
                    content: desired.as_str().to_string(),
                }
            }
            Some(record) => self.update(family, &record, &desired).await,
            None => self.create_if_allowed(family, &desired).await,
        }
    }

    /// Query the current record for every configured family without mutating
    pub async fn current_records(&self) -> Vec<(AddressFamily, Result<Option<RecordSnapshot>>)> {
        let mut records = Vec::with_capacity(self.settings.families.len());
        for &family in &self.settings.families {
            records.push((family, self.fetch(family).await));
        }
        records
    }

    /// Set the record for `family` to `literal`, regardless of current content
    ///
    /// The literal must be a valid address of `family`. An absent record is
    /// created only when add-if-missing is enabled. Manual changes are logged
    /// but not notified.
    ///
    /// # Returns
    ///
    /// - `Err(Error::InvalidInput)`: The literal does not match the family
    /// - `Ok(ReconcileOutcome)`: The outcome of the fetch and mutation
    pub async fn force_set(&self, family: AddressFamily, literal: &str) -> Result<ReconcileOutcome> {
        let desired = ResolvedAddress::parse(family, literal)
            .map_err(|_| Error::invalid_input(format!("Invalid {} address: {}", family, literal)))?;

        info!(
            "Setting {} record for {} to {}",
            family,
            self.settings.record_name,
            desired.as_str()
        );

        let outcome = match self.fetch(family).await {
            Ok(Some(record)) => self.update(family, &record, &desired).await,
            Ok(None) => self.create_if_allowed(family, &desired).await,
            Err(e) => self.store_failure(FailureStage::Fetch, e),
        };

        self.log_outcome(family, &outcome);
        Ok(outcome)
    }

    /// Run passes every `interval` until `shutdown` resolves
    ///
    /// The sleep between passes is interrupted as soon as `shutdown`
    /// resolves. A pass already in progress finishes first; its HTTP calls
    /// are bounded by their own timeouts. Pass failures never end the loop.
    pub async fn run_with_shutdown<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Starting reconciliation loop for {} every {}s",
            self.settings.record_name,
            interval.as_secs()
        );

        loop {
            let report = self.run_pass().await;
            if report.has_failures() {
                warn!("Reconciliation pass finished with failures");
            }

            info!("Waiting {} seconds before the next check", interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping reconciliation loop");
                    break;
                }
            }
        }
    }

    async fn fetch(&self, family: AddressFamily) -> Result<Option<RecordSnapshot>> {
        self.store
            .fetch(&self.settings.record_name, family.record_type())
            .await
    }

    async fn update(
        &self,
        family: AddressFamily,
        record: &RecordSnapshot,
        desired: &ResolvedAddress,
    ) -> ReconcileOutcome {
        match self
            .store
            .update(
                &record.id,
                &self.settings.record_name,
                family.record_type(),
                desired.as_str(),
            )
            .await
        {
            Ok(()) => ReconcileOutcome::Updated {
                previous: record.content.clone(),
                new: desired.as_str().to_string(),
            },
            Err(e) => ReconcileOutcome::failed(
                FailureStage::Update,
                format!(
                    "{} update from {} to {} failed: {}",
                    self.store.provider_name(),
                    record.content,
                    desired.as_str(),
                    e
                ),
            ),
        }
    }

    async fn create_if_allowed(&self, family: AddressFamily, desired: &ResolvedAddress) -> ReconcileOutcome {
        if !self.settings.add_if_missing {
            return ReconcileOutcome::failed(
                FailureStage::Missing,
                format!(
                    "no {} record exists and add_record_if_missing is disabled",
                    family.record_type()
                ),
            );
        }

        info!(
            "{} record for {} not found, creating it",
            family.record_type(),
            self.settings.record_name
        );

        match self
            .store
            .create(&self.settings.record_name, family.record_type(), desired.as_str())
            .await
        {
            Ok(id) => {
                debug!("Created record id {}", id);
                ReconcileOutcome::Created {
                    new: desired.as_str().to_string(),
                }
            }
            Err(e) => ReconcileOutcome::failed(
                FailureStage::Create,
                format!(
                    "{} create with {} failed: {}",
                    self.store.provider_name(),
                    desired.as_str(),
                    e
                ),
            ),
        }
    }

    fn store_failure(&self, stage: FailureStage, error: Error) -> ReconcileOutcome {
        ReconcileOutcome::failed(
            stage,
            format!("{} {} failed: {}", self.store.provider_name(), stage, error),
        )
    }

    fn log_outcome(&self, family: AddressFamily, outcome: &ReconcileOutcome) {
        let message = outcome.describe(family, &self.settings.record_name);
        if outcome.is_failure() {
            error!("{}", message);
        } else {
            info!("{}", message);
        }
    }

    /// Terminal step of the per-family state machine
    async fn report(&self, family: AddressFamily, outcome: &ReconcileOutcome) {
        self.log_outcome(family, outcome);

        if matches!(outcome, ReconcileOutcome::Unchanged { .. }) || !self.settings.notify {
            return;
        }
        self.notifier
            .notify(&outcome.describe(family, &self.settings.record_name))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_descriptions() {
        let updated = ReconcileOutcome::Updated {
            previous: "203.0.113.4".to_string(),
            new: "203.0.113.5".to_string(),
        };
        assert_eq!(
            updated.describe(AddressFamily::V4, "home.example.com"),
            "IPv4 DNS record for home.example.com updated from 203.0.113.4 to 203.0.113.5 successfully."
        );

        let failed = ReconcileOutcome::failed(FailureStage::Resolve, "timeout");
        assert_eq!(
            failed.describe(AddressFamily::V6, "home.example.com"),
            "IPv6 DNS record for home.example.com failed (resolve): timeout"
        );
        assert!(failed.is_failure());
        assert!(!failed.is_mutation());
        assert!(updated.is_mutation());
    }

    #[test]
    fn pass_report_lookup() {
        let report = PassReport {
            started_at: Utc::now(),
            outcomes: vec![
                (
                    AddressFamily::V4,
                    ReconcileOutcome::Unchanged {
                        content: "203.0.113.5".to_string(),
                    },
                ),
                (
                    AddressFamily::V6,
                    ReconcileOutcome::failed(FailureStage::Fetch, "HTTP 500"),
                ),
            ],
        };
        assert!(report.has_failures());
        assert!(matches!(
            report.outcome(AddressFamily::V4),
            Some(ReconcileOutcome::Unchanged { .. })
        ));
        assert!(report.outcome(AddressFamily::V6).unwrap().is_failure());
    }
}
