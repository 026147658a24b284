//! In-place rewriting of A records inside DNS responses.
//!
//! Answers produced by a guest reference the guest's own address, which is
//! unreachable from the LAN. The rewriter patches those A-record values to
//! the externally reachable address before the response leaves the host.

use std::net::Ipv4Addr;

use crate::dns::consts::{RecordType, DNS_MAX_UDP_SIZE, RCODE_NOERROR};
use crate::dns::parser::RecordIter;

/// Rewrites embedded IPv4 A-record values that match a configured address.
#[derive(Debug, Clone, Copy)]
pub struct AddressRewriter {
    search_addr: Ipv4Addr,
}

impl AddressRewriter {
    /// Create a rewriter that matches `search_addr`.
    pub fn new(search_addr: Ipv4Addr) -> Self {
        Self { search_addr }
    }

    /// The address this rewriter matches.
    pub fn search_addr(&self) -> Ipv4Addr {
        self.search_addr
    }

    /// Overwrite every A record equal to the search address with
    /// `replacement`, in place. Returns the number of records rewritten.
    ///
    /// Buffers that are too large, are not a NOERROR response, or do not
    /// walk as a DNS message are left byte-identical; multicast traffic
    /// that is not DNS (SSDP, for instance) passes through here unchanged.
    pub fn rewrite(&self, buf: &mut [u8], replacement: Ipv4Addr) -> usize {
        if buf.len() > DNS_MAX_UDP_SIZE {
            return 0;
        }

        let Ok((header, records)) = RecordIter::new(buf) else {
            return 0;
        };
        if !header.is_response() || header.response_code() != RCODE_NOERROR {
            return 0;
        }

        // Locate every match before mutating anything, so a message that
        // turns out to be malformed halfway through is left untouched.
        let search = self.search_addr.octets();
        let mut offsets = Vec::new();
        for record in records {
            let Ok(record) = record else {
                return 0;
            };
            if record.record_type == RecordType::A
                && record.rdata_len == 4
                && buf[record.rdata_offset..record.rdata_offset + 4] == search
            {
                offsets.push(record.rdata_offset);
            }
        }

        let octets = replacement.octets();
        for &offset in &offsets {
            buf[offset..offset + 4].copy_from_slice(&octets);
        }
        offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUEST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
    const LAN: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

    /// Response with an A record for "host.local" carrying `addr`, plus a
    /// TXT record after it.
    fn response_with_a(addr: Ipv4Addr) -> Vec<u8> {
        let a = addr.octets();
        #[rustfmt::skip]
        let packet = vec![
            // Header
            0x00, 0x00,
            0x84, 0x00, // Flags (response, authoritative, NOERROR)
            0x00, 0x00,
            0x00, 0x02, // Answers: 2
            0x00, 0x00,
            0x00, 0x00,
            // Answer 1: host.local A
            0x04, b'h', b'o', b's', b't',
            0x05, b'l', b'o', b'c', b'a', b'l',
            0x00,
            0x00, 0x01, // Type: A
            0x80, 0x01,
            0x00, 0x00, 0x00, 0x78,
            0x00, 0x04,
            a[0], a[1], a[2], a[3],
            // Answer 2: TXT record, compressed name
            0xC0, 0x0C,
            0x00, 0x10, // Type: TXT
            0x80, 0x01,
            0x00, 0x00, 0x00, 0x78,
            0x00, 0x05,
            0x04, b't', b'e', b's', b't',
        ];
        packet
    }

    #[test]
    fn test_rewrites_matching_a_record() {
        let mut buf = response_with_a(GUEST);
        let expected = response_with_a(LAN);

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 1);

        // Identical except the four RDATA bytes
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_leaves_non_matching_a_record() {
        let original = response_with_a(Ipv4Addr::new(10, 0, 0, 99));
        let mut buf = original.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_rewrites_every_match() {
        // Two A records with the guest address
        let mut buf = response_with_a(GUEST);
        // Rewrite the TXT record into a second A record
        let len = buf.len();
        buf[40] = 0x00;
        buf[41] = 0x01;
        buf[len - 7] = 0x00;
        buf[len - 6] = 0x04;
        buf.truncate(len - 5);
        buf.extend_from_slice(&GUEST.octets());

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 2);
        assert_eq!(&buf[34..38], &LAN.octets());
        assert_eq!(&buf[buf.len() - 4..], &LAN.octets());
    }

    #[test]
    fn test_query_untouched() {
        let mut buf = response_with_a(GUEST);
        buf[2] = 0x00; // Clear the QR bit
        let original = buf.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_error_rcode_untouched() {
        let mut buf = response_with_a(GUEST);
        buf[3] = 0x03; // NXDOMAIN
        let original = buf.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_oversize_untouched() {
        let mut buf = response_with_a(GUEST);
        buf.resize(DNS_MAX_UDP_SIZE + 1, 0);
        let original = buf.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_malformed_untouched() {
        // Truncate mid-record: the walk fails and nothing is written, even
        // though the first A record was already located
        let mut buf = response_with_a(GUEST);
        buf.truncate(buf.len() - 3);
        let original = buf.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_non_dns_payload_untouched() {
        // SSDP is plain text and fails the DNS walk
        let mut buf = b"M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\n\r\n".to_vec();
        let original = buf.clone();

        let rewriter = AddressRewriter::new(GUEST);
        assert_eq!(rewriter.rewrite(&mut buf, LAN), 0);
        assert_eq!(buf, original);
    }
}
