pub mod context;
pub mod error;
pub mod ledger;
pub mod retry;
