//! Shared fixtures: synthetic BAM files written through rust-htslib.

use std::path::Path;

use rust_htslib::bam::header::{Header, HeaderRecord};
use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::{self, Record};

pub const PAIRED: u16 = 0x1;
pub const UNMAPPED: u16 = 0x4;
pub const FIRST_IN_TEMPLATE: u16 = 0x40;
pub const LAST_IN_TEMPLATE: u16 = 0x80;
pub const SECONDARY: u16 = 0x100;

/// Header with one reference sequence and the given `SO:` value.
pub fn header(sort_order: &str, reference: &str) -> Header {
    let mut header = Header::new();
    let mut hd = HeaderRecord::new(b"HD");
    hd.push_tag(b"VN", &"1.6");
    hd.push_tag(b"SO", &sort_order);
    header.push_record(&hd);
    let mut sq = HeaderRecord::new(b"SQ");
    sq.push_tag(b"SN", &reference);
    sq.push_tag(b"LN", &10_000i64);
    header.push_record(&sq);
    header
}

/// A four-base record. Mapped records get a `4M` CIGAR against tid 0;
/// records flagged unmapped get neither. Integer tags are appended as
/// given.
pub fn rec(name: &str, flags: u16, tags: &[(&[u8; 2], i32)]) -> Record {
    let mut record = Record::new();
    if flags & UNMAPPED == 0 {
        let cigar = CigarString(vec![Cigar::Match(4)]);
        record.set(name.as_bytes(), Some(&cigar), b"ACGT", &[30u8; 4]);
        record.set_tid(0);
        record.set_pos(100);
    } else {
        record.set(name.as_bytes(), None, b"ACGT", &[30u8; 4]);
    }
    record.set_flags(flags);
    for (tag, value) in tags {
        record.push_aux(*tag, Aux::I32(*value)).expect("push tag");
    }
    record
}

/// Write records to a BAM file under the given header.
pub fn write_bam(path: &Path, header: &Header, records: &[Record]) {
    let mut writer =
        bam::Writer::from_path(path, header, bam::Format::Bam).expect("create test BAM");
    for record in records {
        writer.write(record).expect("write test record");
    }
}

/// Read every record of a BAM file back, with the header text.
pub fn read_bam(path: &Path) -> (String, Vec<Record>) {
    use bam::Read;
    let mut reader = bam::Reader::from_path(path).expect("open test BAM");
    let text = String::from_utf8_lossy(reader.header().as_bytes()).into_owned();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .expect("read test records");
    (text, records)
}
