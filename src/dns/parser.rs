//! DNS message walking.
//!
//! A minimal cursor-tracked walker over raw DNS/mDNS message bytes. It
//! validates just enough structure to locate resource records safely and
//! reports the byte offset of each record's RDATA within the original
//! buffer, so callers can mutate record values in place.

use crate::dns::consts::RecordType;
use crate::error::{Error, Result};

/// Fixed DNS header length.
pub const HEADER_LEN: usize = 12;

/// Parsed DNS message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsHeader {
    /// Transaction ID.
    pub transaction_id: u16,
    /// Raw flags field.
    pub flags: u16,
    /// Question count.
    pub qdcount: u16,
    /// Answer count.
    pub ancount: u16,
    /// Authority count.
    pub nscount: u16,
    /// Additional count.
    pub arcount: u16,
}

impl DnsHeader {
    /// Parse the fixed header from the start of a message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Parse("too short for DNS header".to_string()));
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            flags: u16::from_be_bytes([data[2], data[3]]),
            qdcount: u16::from_be_bytes([data[4], data[5]]),
            ancount: u16::from_be_bytes([data[6], data[7]]),
            nscount: u16::from_be_bytes([data[8], data[9]]),
            arcount: u16::from_be_bytes([data[10], data[11]]),
        })
    }

    /// Whether this is a response (vs query).
    pub fn is_response(&self) -> bool {
        (self.flags & 0x8000) != 0
    }

    /// The RCODE field from the flags word.
    pub fn response_code(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }

    /// Total resource records across the answer, authority, and additional
    /// sections.
    pub fn record_count(&self) -> usize {
        self.ancount as usize + self.nscount as usize + self.arcount as usize
    }
}

/// Skip over an encoded DNS name starting at `offset`.
///
/// Returns the offset just past the name in the original data. Compression
/// pointers (2 bytes starting with 0xC0) terminate a name, so they are
/// stepped over without being followed.
pub fn skip_name(data: &[u8], offset: usize) -> Result<usize> {
    let mut current = offset;

    while current < data.len() {
        let length = data[current] as usize;

        // End of name
        if length == 0 {
            return Ok(current + 1);
        }

        // Compression pointer: top 2 bits are 11
        if (length & 0xC0) == 0xC0 {
            if current + 2 > data.len() {
                return Err(Error::Parse("truncated compression pointer".to_string()));
            }
            return Ok(current + 2);
        }

        // Regular label
        current += 1 + length;
        if current > data.len() {
            return Err(Error::Parse("label extends past end of data".to_string()));
        }
    }

    Err(Error::Parse("unterminated name".to_string()))
}

/// One resource record located within a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Record type (A, PTR, TXT, etc.).
    pub record_type: RecordType,
    /// Record class, including the mDNS cache-flush bit.
    pub record_class: u16,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Byte offset of the record's RDATA within the message buffer.
    pub rdata_offset: usize,
    /// RDATA length in bytes.
    pub rdata_len: usize,
}

/// Iterator over the resource records of a DNS message, in wire order
/// across the answer, authority, and additional sections.
pub struct RecordIter<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> RecordIter<'a> {
    /// Parse the header and skip the question section, leaving the walker
    /// positioned at the first resource record.
    pub fn new(data: &'a [u8]) -> Result<(DnsHeader, Self)> {
        let header = DnsHeader::parse(data)?;

        let mut offset = HEADER_LEN;
        for _ in 0..header.qdcount {
            offset = skip_name(data, offset)?;
            if offset + 4 > data.len() {
                return Err(Error::Parse("truncated question".to_string()));
            }
            offset += 4;
        }

        let iter = Self {
            data,
            offset,
            remaining: header.record_count(),
        };
        Ok((header, iter))
    }

    fn parse_next(&mut self) -> Result<RawRecord> {
        let data = self.data;

        let mut offset = skip_name(data, self.offset)?;
        if offset + 10 > data.len() {
            return Err(Error::Parse("truncated record header".to_string()));
        }

        let rtype = u16::from_be_bytes([data[offset], data[offset + 1]]);
        let rclass = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
        let ttl = u32::from_be_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]);
        let rdlength = u16::from_be_bytes([data[offset + 8], data[offset + 9]]) as usize;
        offset += 10;

        if offset + rdlength > data.len() {
            return Err(Error::Parse("RDATA extends past end of data".to_string()));
        }

        let record = RawRecord {
            record_type: RecordType::from_u16(rtype),
            record_class: rclass,
            ttl,
            rdata_offset: offset,
            rdata_len: rdlength,
        };
        self.offset = offset + rdlength;
        Ok(record)
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.parse_next();
        if result.is_err() {
            // Fuse: once the walk goes wrong, later offsets are meaningless
            self.remaining = 0;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_name_simple() {
        // "local" = 5 'l' 'o' 'c' 'a' 'l' 0
        let data = b"\x05local\x00";
        assert_eq!(skip_name(data, 0).unwrap(), 7);
    }

    #[test]
    fn test_skip_name_multiple_labels() {
        // "_googlecast._tcp.local"
        let data = b"\x0b_googlecast\x04_tcp\x05local\x00";
        assert_eq!(skip_name(data, 0).unwrap(), data.len());
    }

    #[test]
    fn test_skip_name_with_compression() {
        // Offset 0: "\x05local\x00" (7 bytes)
        // Offset 7: "\x03foo\xC0\x00" (label + 2-byte pointer)
        let data = b"\x05local\x00\x03foo\xC0\x00";
        assert_eq!(skip_name(data, 7).unwrap(), 13);
    }

    #[test]
    fn test_skip_name_truncated_pointer() {
        let data = b"\x05local\x00\xC0";
        assert!(skip_name(data, 7).is_err());
    }

    #[test]
    fn test_skip_name_unterminated() {
        let data = b"\x03foo";
        assert!(skip_name(data, 0).is_err());
    }

    #[test]
    fn test_skip_name_label_past_end() {
        let data = b"\x0afoo";
        assert!(skip_name(data, 0).is_err());
    }

    #[test]
    fn test_header_parse_flags() {
        #[rustfmt::skip]
        let data: &[u8] = &[
            0x12, 0x34, // Transaction ID
            0x84, 0x03, // Flags: response, authoritative, RCODE=3
            0x00, 0x01, // Questions: 1
            0x00, 0x02, // Answers: 2
            0x00, 0x00, // Authority: 0
            0x00, 0x01, // Additional: 1
        ];

        let header = DnsHeader::parse(data).unwrap();
        assert_eq!(header.transaction_id, 0x1234);
        assert!(header.is_response());
        assert_eq!(header.response_code(), 3);
        assert_eq!(header.qdcount, 1);
        assert_eq!(header.record_count(), 3);
    }

    #[test]
    fn test_header_too_short() {
        assert!(DnsHeader::parse(&[0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_record_iter_reports_rdata_offset() {
        // Response with one A record for "host.local"
        #[rustfmt::skip]
        let packet: &[u8] = &[
            // Header
            0x00, 0x00, // Transaction ID
            0x84, 0x00, // Flags (response, authoritative)
            0x00, 0x00, // Questions: 0
            0x00, 0x01, // Answers: 1
            0x00, 0x00, // Authority: 0
            0x00, 0x00, // Additional: 0
            // Answer: host.local A 10.0.0.5
            0x04, b'h', b'o', b's', b't',
            0x05, b'l', b'o', b'c', b'a', b'l',
            0x00, // End of name
            0x00, 0x01, // Type: A
            0x80, 0x01, // Class: IN with cache-flush
            0x00, 0x00, 0x00, 0x78, // TTL: 120
            0x00, 0x04, // RDLENGTH: 4
            10, 0, 0, 5, // RDATA
        ];

        let (header, mut iter) = RecordIter::new(packet).unwrap();
        assert!(header.is_response());

        let record = iter.next().unwrap().unwrap();
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.ttl, 120);
        assert_eq!(record.rdata_len, 4);
        // Name ends at 24, fixed record header is 10 bytes
        assert_eq!(record.rdata_offset, 34);
        assert_eq!(&packet[record.rdata_offset..record.rdata_offset + 4], &[10, 0, 0, 5]);

        assert!(iter.next().is_none());
    }

    #[test]
    fn test_record_iter_skips_questions() {
        // Query-style message with one question and one answer
        #[rustfmt::skip]
        let packet: &[u8] = &[
            0x00, 0x00,
            0x84, 0x00,
            0x00, 0x01, // Questions: 1
            0x00, 0x01, // Answers: 1
            0x00, 0x00,
            0x00, 0x00,
            // Question: host.local A IN
            0x04, b'h', b'o', b's', b't',
            0x05, b'l', b'o', b'c', b'a', b'l',
            0x00,
            0x00, 0x01,
            0x00, 0x01,
            // Answer: compressed name pointing at the question
            0xC0, 0x0C,
            0x00, 0x01,
            0x00, 0x01,
            0x00, 0x00, 0x00, 0x78,
            0x00, 0x04,
            192, 168, 1, 20,
        ];

        let (_, mut iter) = RecordIter::new(packet).unwrap();
        let record = iter.next().unwrap().unwrap();
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(
            &packet[record.rdata_offset..record.rdata_offset + record.rdata_len],
            &[192, 168, 1, 20]
        );
    }

    #[test]
    fn test_record_iter_truncated_record_errors_and_fuses() {
        // Claims one answer but the record is cut off mid-header
        #[rustfmt::skip]
        let packet: &[u8] = &[
            0x00, 0x00,
            0x84, 0x00,
            0x00, 0x00,
            0x00, 0x01, // Answers: 1
            0x00, 0x00,
            0x00, 0x00,
            0x04, b'h', b'o', b's', b't', 0x00,
            0x00, 0x01,
        ];

        let (_, mut iter) = RecordIter::new(packet).unwrap();
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_record_iter_rdata_past_end_errors() {
        #[rustfmt::skip]
        let packet: &[u8] = &[
            0x00, 0x00,
            0x84, 0x00,
            0x00, 0x00,
            0x00, 0x01,
            0x00, 0x00,
            0x00, 0x00,
            0x04, b'h', b'o', b's', b't', 0x00,
            0x00, 0x01,
            0x00, 0x01,
            0x00, 0x00, 0x00, 0x78,
            0x00, 0x10, // RDLENGTH: 16, but only 4 bytes follow
            10, 0, 0, 5,
        ];

        let (_, mut iter) = RecordIter::new(packet).unwrap();
        assert!(iter.next().unwrap().is_err());
    }
}
