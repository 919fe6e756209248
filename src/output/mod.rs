//! Per-category BAM output channels.

mod channel;
mod router;

pub use channel::{Channel, OutputError};
pub use router::{OutputPlan, OutputRouter};
