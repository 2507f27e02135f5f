//! `Transport:` header parsing (C2, spec §4.2).
//!
//! Grounded on `session/transport.rs::TransportHeader::parse` in the
//! teacher crate (semicolon tokenizing, `client_port=lo-hi` extraction),
//! generalized into a full token map so SETUP can also read `interleaved=`,
//! `mode=record`, and the `RTP/AVP`/`RTP/AVP/TCP` protocol flag — none of
//! which the teacher's push-only server ever needed.

use crate::config::Protocol;

/// A parsed `Transport:` header value.
///
/// Tokenizes on `;`; each token is either a bare flag (`unicast`,
/// `RTP/AVP`, `RTP/AVP/TCP`, `mode=record`, ...) or `key=value`. Order and
/// surrounding whitespace are not significant. Duplicate keys keep
/// whichever occurrence is encountered first.
#[derive(Debug, Clone, Default)]
pub struct TransportHeader {
    flags: Vec<String>,
    values: Vec<(String, String)>,
}

impl TransportHeader {
    /// Parse the `Transport` header value (RFC 2326 §12.39).
    pub fn parse(header: &str) -> Self {
        let mut flags = Vec::new();
        let mut values = Vec::new();

        for part in header.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim().to_ascii_lowercase();
                    if !values.iter().any(|(k, _): &(String, String)| *k == key) {
                        values.push((key, value.trim().to_string()));
                    }
                }
                None => flags.push(part.to_string()),
            }
        }

        Self { flags, values }
    }

    /// Whether a bare flag (case-sensitive, per the protocol tokens RTSP
    /// actually uses) is present.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Value of a `key=value` token, looked up case-insensitively on the key.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The proposed transport protocol: `RTP/AVP/TCP` flag → TCP, anything
    /// mentioning `RTP/AVP` (with or without `/UDP`) → UDP.
    pub fn protocol(&self) -> Option<Protocol> {
        if self.has_flag("RTP/AVP/TCP") {
            Some(Protocol::Tcp)
        } else if self.has_flag("RTP/AVP") || self.has_flag("RTP/AVP/UDP") {
            Some(Protocol::Udp)
        } else {
            None
        }
    }

    /// Whether `mode=record` was proposed (publisher-branch SETUP).
    pub fn is_record_mode(&self) -> bool {
        self.value("mode")
            .map(|v| v.trim_matches('"').eq_ignore_ascii_case("record"))
            .unwrap_or(false)
    }

    /// Parse a `lo-hi` pair, requiring both halves to parse and be nonzero.
    fn parse_port_pair(raw: &str) -> Option<(u16, u16)> {
        let (lo, hi) = raw.split_once('-')?;
        let lo: u16 = lo.trim().parse().ok()?;
        let hi: u16 = hi.trim().parse().ok()?;
        if lo == 0 || hi == 0 {
            return None;
        }
        Some((lo, hi))
    }

    /// `client_port=lo-hi`, both nonzero (required for UDP SETUPs, spec §4.2/§8).
    pub fn client_port(&self) -> Option<(u16, u16)> {
        self.value("client_port").and_then(Self::parse_port_pair)
    }

    /// `interleaved=lo-hi` channel pair (TCP SETUPs).
    pub fn interleaved(&self) -> Option<(u8, u8)> {
        let (lo, hi) = self.value("interleaved").and_then(|raw| {
            let (lo, hi) = raw.split_once('-')?;
            Some((lo.trim().parse::<u16>().ok()?, hi.trim().parse::<u16>().ok()?))
        })?;
        if lo > u8::MAX as u16 || hi > u8::MAX as u16 {
            return None;
        }
        Some((lo as u8, hi as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_udp_reader_transport() {
        let t = TransportHeader::parse("RTP/AVP;unicast;client_port=5000-5001");
        assert_eq!(t.protocol(), Some(Protocol::Udp));
        assert!(t.has_flag("unicast"));
        assert_eq!(t.client_port(), Some((5000, 5001)));
        assert!(!t.is_record_mode());
    }

    #[test]
    fn parses_udp_publisher_transport() {
        let t = TransportHeader::parse("RTP/AVP;unicast;client_port=6000-6001;mode=record");
        assert!(t.is_record_mode());
        assert_eq!(t.client_port(), Some((6000, 6001)));
    }

    #[test]
    fn parses_tcp_transport_with_interleaved() {
        let t = TransportHeader::parse("RTP/AVP/TCP;unicast;interleaved=0-1");
        assert_eq!(t.protocol(), Some(Protocol::Tcp));
        assert_eq!(t.interleaved(), Some((0, 1)));
    }

    #[test]
    fn rejects_zero_port() {
        let t = TransportHeader::parse("RTP/AVP;unicast;client_port=0-1");
        assert_eq!(t.client_port(), None);
    }

    #[test]
    fn missing_client_port_is_none() {
        let t = TransportHeader::parse("RTP/AVP;unicast");
        assert_eq!(t.client_port(), None);
    }

    #[test]
    fn is_permissive_on_order_and_whitespace() {
        let t = TransportHeader::parse(" mode=record ; RTP/AVP ;client_port=10-11 ;unicast");
        assert!(t.is_record_mode());
        assert_eq!(t.client_port(), Some((10, 11)));
        assert_eq!(t.protocol(), Some(Protocol::Udp));
    }

    #[test]
    fn duplicate_key_keeps_first() {
        let t = TransportHeader::parse("client_port=1-2;client_port=3-4");
        assert_eq!(t.client_port(), Some((1, 2)));
    }
}
