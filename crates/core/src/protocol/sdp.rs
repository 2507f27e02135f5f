//! SDP (Session Description Protocol) handling (RFC 4566 / RFC 8866).
//!
//! The core never generates or interprets SDP bodies — a publisher's SDP
//! is relayed to readers verbatim (spec §6). The one thing the core needs
//! is the number of `m=` media lines, to size the track list (I4: tracks
//! may never exceed media count).
//!
//! Grounded on the line-dispatch style of
//! `other_examples/1c01fddc_SigmaColourMedia-SigmaMediaServer_..._sdp_2.rs`
//! (`line.split_once('=')`, matching on the SDP type character), reduced to
//! the single field the spec says the core depends on.

/// Count the `m=` media description lines in a raw SDP body.
///
/// Accepts either `\n`- or `\r\n`-terminated lines. Lines are otherwise
/// opaque to the core.
pub fn count_media_lines(sdp: &[u8]) -> usize {
    let text = String::from_utf8_lossy(sdp);
    text.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(field, _)| *field == "m")
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_MEDIA_SDP: &str = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=stream\r\nt=0 0\r\nm=video 0 RTP/AVP 96\r\na=rtpmap:96 H264/90000\r\n";

    const TWO_MEDIA_SDP: &str = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=stream\r\nt=0 0\r\nm=video 0 RTP/AVP 96\r\na=rtpmap:96 H264/90000\r\nm=audio 0 RTP/AVP 97\r\na=rtpmap:97 mpeg4-generic/48000\r\n";

    #[test]
    fn counts_single_media_section() {
        assert_eq!(count_media_lines(ONE_MEDIA_SDP.as_bytes()), 1);
    }

    #[test]
    fn counts_multiple_media_sections() {
        assert_eq!(count_media_lines(TWO_MEDIA_SDP.as_bytes()), 2);
    }

    #[test]
    fn zero_for_sdp_with_no_media() {
        let sdp = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=stream\r\nt=0 0\r\n";
        assert_eq!(count_media_lines(sdp.as_bytes()), 0);
    }

    #[test]
    fn ignores_non_sdp_noise() {
        let sdp = "not sdp at all\r\njust=noise\r\n";
        assert_eq!(count_media_lines(sdp.as_bytes()), 0);
    }
}
