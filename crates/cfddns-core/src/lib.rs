// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// This library owns every decision in the system:
// - **AddressSource**: Trait for a single-shot public IP lookup
// - **RecordStore**: Trait for fetching, creating and updating DNS records
// - **Notifier**: Trait for best-effort operator notifications
// - **AddressResolver**: Bounded retry around an `AddressSource`
// - **Reconciler**: Resolve → fetch → compare → mutate → report, per family
//
// ## Design Principles
//
// 1. **Core-owned policy**: Retries, creation policy and notification policy
//    live here. Plugin crates perform one request per call.
// 2. **Explicit configuration**: Configuration is an immutable value passed
//    into constructors, never global state.
// 3. **Contained failure**: A failure is confined to one address family in
//    one pass. Nothing here exits the process.
// 4. **Idempotency**: A pass that finds the record already correct issues no
//    mutation.

pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{CfDdnsConfig, FamilyMode};
pub use engine::{FailureStage, PassReport, ReconcileOutcome, ReconcileSettings, Reconciler};
pub use error::{Error, Result};
pub use resolver::{AddressResolver, ResolvedAddress};
pub use traits::{
    AddressFamily, AddressSource, NoopNotifier, Notifier, RecordSnapshot, RecordStore, RecordType,
};
