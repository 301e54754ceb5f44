//! Group roster, recorded transactions and the normalizer that admits them.

pub mod group;
pub mod normalizer;
pub mod transaction;

pub use group::Group;
pub use normalizer::{normalize, AMOUNT_TOLERANCE};
pub use transaction::{Involvement, Payers, Transaction, TransactionRequest};
