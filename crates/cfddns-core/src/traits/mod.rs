//! Core traits for cfddns
//!
//! This module defines the abstract interfaces that plugin crates implement.
//!
//! - [`AddressSource`]: Look up the current public address once
//! - [`RecordStore`]: Query and mutate DNS records at the provider
//! - [`Notifier`]: Deliver operator messages, best effort

pub mod address_source;
pub mod notifier;
pub mod record_store;

pub use address_source::{AddressFamily, AddressSource};
pub use notifier::{Notifier, NoopNotifier};
pub use record_store::{RecordSnapshot, RecordStore, RecordType};
