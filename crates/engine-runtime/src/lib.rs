pub mod error;
pub mod execution;
pub mod report;
pub mod sync;
