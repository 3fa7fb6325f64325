//! Cocoa sales ledger: a proof-of-work sales ledger behind a REST API.

pub mod api;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod logger;

pub use config::Config;
pub use contract::{LedgerContract, SalesContract};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Block, Blockchain, Sale};
