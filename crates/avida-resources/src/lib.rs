//! # Avida Resources
//!
//! Resource Ledger for sandboxed organism tests.
//!
//! ## Accounting Methods
//!
//! ```text
//! Fresh       initial quantities from definitions, no inflow while testing
//! Historical  seed from the latest snapshot at or before the update, follow
//!             the series while advancing, extrapolate past its end
//! Exact       seed from the snapshot at exactly the update, follow the
//!             series while advancing, freeze past its end
//! ```
//!
//! ## Scopes
//!
//! A [`ResourceBank`] holds four advancing ledgers (ambient, faced cell,
//! deme, cell) and a frozen copy of the seed levels. Every bank is owned by a
//! single test run; nothing in it points back at the live world.

pub mod bank;
pub mod history;
pub mod ledger;
pub mod method;

pub use bank::{BankSettings, ResourceBank};
pub use history::{ResourceHistory, SharedHistory, Snapshot};
pub use ledger::ResourceLedger;
pub use method::AccountingMethod;
