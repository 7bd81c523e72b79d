pub mod cache;
pub mod calculator;
pub mod clock;
pub mod commands;
pub mod contracts;
pub mod dates;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod money;
pub mod setup;
pub mod state;

pub use commands::CommandContext;
pub use contracts::envelope::SuccessEnvelope;
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
