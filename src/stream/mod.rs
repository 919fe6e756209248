//! Reading BAM streams as same-name record batches.

mod batch;
mod mates;

pub use batch::{AlignBatch, BatchReader, SortOrder, StreamError};
pub use mates::{split_forward_reverse, StrandHalves};
