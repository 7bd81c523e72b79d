pub mod calculate;
pub mod claim;
pub(crate) mod common;
pub mod program;
pub mod report;
pub mod transaction;

pub use common::CommandContext;
