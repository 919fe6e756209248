//! Partitioning a batch into forward and reverse reads.

use rust_htslib::bam::Record;

use super::batch::{AlignBatch, StreamError};

/// A batch partitioned into its forward and reverse reads, borrowing the
/// records in their original order.
#[derive(Debug)]
pub struct StrandHalves<'a> {
    /// Records of the first-in-template read (or of an unpaired read).
    pub forward: Vec<&'a Record>,
    /// Records of the last-in-template read.
    pub reverse: Vec<&'a Record>,
}

/// Split a batch by mate flag in a single pass.
///
/// Forward means flag 0x40 (first in template); unpaired records are
/// forward by definition. Reverse means flag 0x80 (last in template); a
/// record somehow carrying both flags counts as forward. A paired record
/// with neither flag violates the BAM contract and is fatal.
pub fn split_forward_reverse(batch: &AlignBatch) -> Result<StrandHalves<'_>, StreamError> {
    let mut forward = Vec::new();
    let mut reverse = Vec::new();
    for record in batch.records() {
        if record.is_first_in_template() || !record.is_paired() {
            forward.push(record);
        } else if record.is_last_in_template() {
            reverse.push(record);
        } else {
            return Err(StreamError::MissingMateFlag {
                name: batch.name_lossy(),
            });
        }
    }
    Ok(StrandHalves { forward, reverse })
}
