//! Grouping consecutive same-name BAM records into batches.

use std::path::{Path, PathBuf};

use rust_htslib::bam::{self, HeaderView, Read, Record};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced while opening or reading a BAM stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The file could not be opened as BAM.
    #[error("failed to open BAM file {path}")]
    Open {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying htslib error.
        #[source]
        source: rust_htslib::errors::Error,
    },

    /// The stream declares coordinate sort order; batching requires
    /// records grouped by read name.
    #[error(
        "BAM file {path} is coordinate-sorted; inputs must be grouped by \
         read name (samtools sort -n, or raw aligner output)"
    )]
    CoordinateSorted {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// A record could not be decoded.
    #[error("failed to read BAM record")]
    Read(#[source] rust_htslib::errors::Error),

    /// A paired record carries neither the first-in-template nor the
    /// last-in-template flag.
    #[error("record {name} carries neither a forward nor a reverse mate flag")]
    MissingMateFlag {
        /// Read name of the offending record.
        name: String,
    },
}

/// Sort order declared in the `@HD SO:` field of a SAM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// No `@HD` line or no recognised `SO:` value.
    Unknown,
    /// Explicitly unsorted; aligners emit reads in input order, which
    /// keeps mates and secondary alignments adjacent.
    Unsorted,
    /// Sorted (grouped) by read name.
    QueryName,
    /// Sorted by reference coordinate; unusable for batching.
    Coordinate,
}

impl SortOrder {
    /// Parse the sort order from SAM header text.
    pub fn from_header_text(text: &str) -> SortOrder {
        let Some(hd) = text.lines().find(|line| line.starts_with("@HD")) else {
            return SortOrder::Unknown;
        };
        let Some(value) = hd
            .split('\t')
            .find_map(|field| field.strip_prefix("SO:"))
        else {
            return SortOrder::Unknown;
        };
        match value {
            "unsorted" => SortOrder::Unsorted,
            "queryname" => SortOrder::QueryName,
            "coordinate" => SortOrder::Coordinate,
            _ => SortOrder::Unknown,
        }
    }
}

/// An ordered, non-empty run of records sharing one read name, in their
/// original stream order.
#[derive(Debug)]
pub struct AlignBatch {
    records: Vec<Record>,
}

impl AlignBatch {
    /// Build a batch from records already known to share a name. Returns
    /// `None` for an empty record list; batches are never empty.
    pub fn from_records(records: Vec<Record>) -> Option<AlignBatch> {
        if records.is_empty() {
            None
        } else {
            Some(AlignBatch { records })
        }
    }

    /// Read name shared by every record of the batch.
    pub fn name(&self) -> &[u8] {
        self.records[0].qname()
    }

    /// Read name as lossy UTF-8, for error reporting.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name()).into_owned()
    }

    /// The records of the batch in stream order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records in the batch (always at least 1).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; kept for `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Pull iterator over the same-name batches of one BAM stream.
///
/// The source must keep records of one read name contiguous (name-grouped,
/// not necessarily globally sorted). Coordinate-sorted inputs are rejected
/// once, at open time, from the header's sort-order declaration.
pub struct BatchReader {
    reader: bam::Reader,
    sort_order: SortOrder,
    lookahead: Option<Record>,
    finished: bool,
}

impl std::fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("sort_order", &self.sort_order)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl BatchReader {
    /// Open a BAM file and validate its sort order.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<BatchReader, StreamError> {
        let path = path.as_ref();
        let reader = bam::Reader::from_path(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(reader.header().as_bytes()).into_owned();
        let sort_order = SortOrder::from_header_text(&text);
        if sort_order == SortOrder::Coordinate {
            return Err(StreamError::CoordinateSorted {
                path: path.to_path_buf(),
            });
        }
        debug!(path = %path.display(), ?sort_order, "opened BAM stream");
        Ok(BatchReader {
            reader,
            sort_order,
            lookahead: None,
            finished: false,
        })
    }

    /// Header of the underlying BAM, including its reference table.
    pub fn header(&self) -> &HeaderView {
        self.reader.header()
    }

    /// Sort order declared by the stream.
    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Pull the next same-name batch, or `None` once the stream is
    /// exhausted. After exhaustion every further call yields `None`.
    pub fn next_batch(&mut self) -> Result<Option<AlignBatch>, StreamError> {
        if self.finished {
            return Ok(None);
        }
        let mut records: Vec<Record> = self.lookahead.take().into_iter().collect();
        loop {
            let mut record = Record::new();
            match self.reader.read(&mut record) {
                Some(Ok(())) => match records.first() {
                    Some(first) if first.qname() != record.qname() => {
                        self.lookahead = Some(record);
                        return Ok(AlignBatch::from_records(records));
                    }
                    _ => records.push(record),
                },
                Some(Err(source)) => return Err(StreamError::Read(source)),
                None => {
                    self.finished = true;
                    return Ok(AlignBatch::from_records(records));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_hd_line() {
        assert_eq!(
            SortOrder::from_header_text("@HD\tVN:1.6\tSO:queryname\n@SQ\tSN:chr1\tLN:1000\n"),
            SortOrder::QueryName
        );
        assert_eq!(
            SortOrder::from_header_text("@HD\tVN:1.6\tSO:coordinate\n"),
            SortOrder::Coordinate
        );
        assert_eq!(
            SortOrder::from_header_text("@HD\tVN:1.6\tSO:unsorted\n"),
            SortOrder::Unsorted
        );
    }

    #[test]
    fn sort_order_defaults_to_unknown() {
        assert_eq!(SortOrder::from_header_text(""), SortOrder::Unknown);
        assert_eq!(
            SortOrder::from_header_text("@SQ\tSN:chr1\tLN:1000\n"),
            SortOrder::Unknown
        );
        assert_eq!(
            SortOrder::from_header_text("@HD\tVN:1.6\n"),
            SortOrder::Unknown
        );
        assert_eq!(
            SortOrder::from_header_text("@HD\tVN:1.6\tSO:sideways\n"),
            SortOrder::Unknown
        );
    }

    #[test]
    fn batches_are_never_empty() {
        assert!(AlignBatch::from_records(Vec::new()).is_none());
        let mut record = Record::new();
        record.set(b"frag", None, b"ACGT", &[30u8; 4]);
        let batch = AlignBatch::from_records(vec![record]).unwrap();
        assert_eq!(batch.name(), b"frag");
        assert_eq!(batch.len(), 1);
    }
}
