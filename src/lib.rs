#![doc(test(attr(deny(warnings))))]

//! Settle Core tracks shared expenses inside a fixed group of people and reduces
//! them to a short list of payments that squares everyone up.
//!
//! ```
//! use settle_core::ledger::{Group, Involvement, TransactionRequest};
//!
//! let mut group = Group::new(["Ann", "Bob", "Cat"]).unwrap();
//! group
//!     .record_transaction(
//!         TransactionRequest::paid_by("Ann")
//!             .involving(Involvement::All)
//!             .total(90.0),
//!     )
//!     .unwrap();
//! let report = group.simplify(None).unwrap();
//! assert_eq!(report.payments.len(), 2);
//! ```

pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod netting;
pub mod utils;

pub use errors::{LedgerError, Result};
pub use ledger::{Group, Involvement, Payers, Transaction, TransactionRequest};
pub use netting::{ConsolidationStatus, NettingOptions, Payment, SettlementMode, SettlementReport};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Settle Core tracing initialized.");
    });
}
