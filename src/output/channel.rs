//! A single writable sink for classified records.

use std::path::PathBuf;

use rust_htslib::bam::{self, Record};
use thiserror::Error;

/// Errors surfaced while creating or writing output channels.
#[derive(Debug, Error)]
pub enum OutputError {
    /// An output BAM could not be created.
    #[error("failed to create output BAM {path}")]
    Create {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying htslib error.
        #[source]
        source: rust_htslib::errors::Error,
    },

    /// A record could not be appended to an output BAM.
    #[error("failed to write record to output BAM")]
    Write(#[source] rust_htslib::errors::Error),
}

/// One output sink, either a real BAM writer or a discard sink for a
/// category without a configured destination.
///
/// The discard variant satisfies the same write contract, so routing never
/// special-cases unconfigured categories. Dropping a channel closes it;
/// htslib finalizes the BGZF EOF block on drop, so channels opened before
/// a mid-run failure still end up as valid, if incomplete, BAM files.
pub enum Channel {
    /// Writes records verbatim to a BAM file.
    Bam(bam::Writer),
    /// Silently discards records.
    Discard,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Bam(_) => f.write_str("Channel::Bam"),
            Channel::Discard => f.write_str("Channel::Discard"),
        }
    }
}

impl Channel {
    /// Append one raw record.
    pub fn write(&mut self, record: &Record) -> Result<(), OutputError> {
        match self {
            Channel::Bam(writer) => writer.write(record).map_err(OutputError::Write),
            Channel::Discard => Ok(()),
        }
    }

    /// Whether this channel writes anywhere.
    pub fn is_discard(&self) -> bool {
        matches!(self, Channel::Discard)
    }
}
