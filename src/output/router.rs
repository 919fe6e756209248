//! Routing classified batches to per-category BAM files.

use std::path::{Path, PathBuf};

use rust_htslib::bam::header::HeaderRecord;
use rust_htslib::bam::{self, CompressionLevel, Header, HeaderView};
use tracing::debug;

use super::channel::{Channel, OutputError};
use crate::classify::{Genome, MappingState};
use crate::stream::AlignBatch;
use crate::PROGRAM_NAME;

/// Where each category's records should go.
///
/// Categories left unset become discard sinks; an entirely empty plan is a
/// valid dry run that only produces statistics.
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    destinations: [Option<PathBuf>; 6],
    compression: Option<u32>,
}

impl OutputPlan {
    /// Plan with no destinations at all.
    pub fn new() -> OutputPlan {
        OutputPlan::default()
    }

    /// Plan writing all six categories as `{prefix}_{category}.bam`.
    pub fn with_basename(prefix: &str) -> OutputPlan {
        let mut plan = OutputPlan::new();
        for state in MappingState::ALL {
            plan.destinations[state.index()] = Some(PathBuf::from(format!("{prefix}_{state}.bam")));
        }
        plan
    }

    /// Set the destination for one category.
    pub fn destination(mut self, state: MappingState, path: impl Into<PathBuf>) -> OutputPlan {
        self.destinations[state.index()] = Some(path.into());
        self
    }

    /// Set the BGZF compression level (0-9) for every file channel.
    pub fn compression(mut self, level: u32) -> OutputPlan {
        self.compression = Some(level);
        self
    }

    /// Configured destination for one category, if any.
    pub fn destination_for(&self, state: MappingState) -> Option<&Path> {
        self.destinations[state.index()].as_deref()
    }
}

/// Owns one output channel per category and dispatches raw records of a
/// classified fragment to the right one.
///
/// Channels for the secondary-flavored categories carry the secondary
/// stream's header and reference table, the remaining four the primary
/// stream's; a record's reference id only resolves against the header of
/// the file it was read from. Closing is ownership-based: dropping the
/// router closes every channel exactly once on any exit path.
#[derive(Debug)]
pub struct OutputRouter {
    channels: [Channel; 6],
}

impl OutputRouter {
    /// Open every configured channel, writing each augmented header
    /// immediately, before any record and even if none ever follows.
    ///
    /// Each file header gains a `@PG` record with the program name and
    /// version and the invoking `command_line`, plus a `@CO` comment
    /// naming the category the file holds.
    pub fn create(
        plan: &OutputPlan,
        primary_header: &HeaderView,
        secondary_header: &HeaderView,
        command_line: &str,
    ) -> Result<OutputRouter, OutputError> {
        let mut channels = [
            Channel::Discard,
            Channel::Discard,
            Channel::Discard,
            Channel::Discard,
            Channel::Discard,
            Channel::Discard,
        ];
        for state in MappingState::ALL {
            let Some(path) = plan.destination_for(state) else {
                continue;
            };
            let template = match state.genome() {
                Some(Genome::Secondary) => secondary_header,
                _ => primary_header,
            };
            let mut header = Header::from_template(template);
            let mut pg = HeaderRecord::new(b"PG");
            pg.push_tag(b"ID", &PROGRAM_NAME);
            pg.push_tag(b"PN", &PROGRAM_NAME);
            pg.push_tag(b"VN", &env!("CARGO_PKG_VERSION"));
            pg.push_tag(b"CL", &command_line);
            header.push_record(&pg);
            header.push_comment(format!("{PROGRAM_NAME} category:{state}").as_bytes());

            let mut writer = bam::Writer::from_path(path, &header, bam::Format::Bam)
                .map_err(|source| OutputError::Create {
                    path: path.to_path_buf(),
                    source,
                })?;
            if let Some(level) = plan.compression {
                writer
                    .set_compression_level(CompressionLevel::Level(level))
                    .map_err(OutputError::Write)?;
            }
            debug!(category = %state, path = %path.display(), "opened output channel");
            channels[state.index()] = Channel::Bam(writer);
        }
        Ok(OutputRouter { channels })
    }

    /// Router whose channels are all discard sinks.
    pub fn discard() -> OutputRouter {
        OutputRouter {
            channels: [
                Channel::Discard,
                Channel::Discard,
                Channel::Discard,
                Channel::Discard,
                Channel::Discard,
                Channel::Discard,
            ],
        }
    }

    /// Append every record of a batch to the category's channel.
    pub fn write_batch(
        &mut self,
        category: MappingState,
        batch: &AlignBatch,
    ) -> Result<(), OutputError> {
        let channel = &mut self.channels[category.index()];
        for record in batch.records() {
            channel.write(record)?;
        }
        Ok(())
    }

    /// Whether the category's channel discards its records.
    pub fn is_discard(&self, category: MappingState) -> bool {
        self.channels[category.index()].is_discard()
    }
}
