//! Ethernet / IPv4 / UDP frame classification and CSI payload extraction.
//!
//! Decides whether a captured frame is a CSI report from the target device
//! and, if so, hands back the raw CSI sample bytes for amplitude
//! extraction. Everything here is pure classification over byte buffers —
//! malformed or truncated captures are rejected with `None`, never a panic.

/// A CSI report accepted by the filter, borrowing from the captured frame.
#[derive(Debug, Clone)]
pub struct CsiFrame<'a> {
    /// Hardware address of the reporting device.
    pub source_mac: [u8; 6],
    /// RSSI of the frame that triggered the report, in dBm.
    pub rssi: i8,
    /// Raw CSI samples: interleaved little-endian `i16` real/imag pairs.
    pub csi: &'a [u8],
}

const ETH_HEADER_LEN: usize = 14;
const ETHERTYPE_IPV4: u16 = 0x0800;
const MIN_IP_HEADER_LEN: usize = 20;
const IP_PROTO_UDP: u8 = 17;
const UDP_HEADER_LEN: usize = 8;

// Offsets inside the UDP payload. The reporting firmware packs a fixed
// header in front of the samples:
//
//   magic(2) rssi(1) frame-control(1) source-mac(6) seq(2)
//   config(2) chanspec(2) chip(2) csi-samples…
const RSSI_OFFSET: usize = 2;
const MAC_OFFSET: usize = 4;
const CSI_OFFSET: usize = 18;

/// Try to classify a raw captured frame as a CSI report from `target`
/// arriving on UDP `port`.
///
/// Returns `None` for anything else: non-IPv4, non-UDP, wrong port, wrong
/// source device, or a frame too short to contain the expected headers.
pub fn parse_frame<'a>(data: &'a [u8], port: u16, target: &[u8; 6]) -> Option<CsiFrame<'a>> {
    if data.len() < ETH_HEADER_LEN {
        return None;
    }
    if u16::from_be_bytes([data[12], data[13]]) != ETHERTYPE_IPV4 {
        return None;
    }

    let ip = &data[ETH_HEADER_LEN..];
    if ip.len() < MIN_IP_HEADER_LEN {
        return None;
    }
    if ip[0] >> 4 != 4 {
        return None;
    }
    let ihl = ((ip[0] & 0x0f) as usize) * 4;
    if ihl < MIN_IP_HEADER_LEN || ip.len() < ihl + UDP_HEADER_LEN {
        return None;
    }
    if ip[9] != IP_PROTO_UDP {
        return None;
    }

    let udp = &ip[ihl..];
    let dst_port = u16::from_be_bytes([udp[2], udp[3]]);
    if dst_port != port {
        return None;
    }

    let payload = &udp[UDP_HEADER_LEN..];
    if payload.len() < CSI_OFFSET {
        return None;
    }

    let mut source_mac = [0u8; 6];
    source_mac.copy_from_slice(&payload[MAC_OFFSET..MAC_OFFSET + 6]);
    if &source_mac != target {
        return None;
    }

    Some(CsiFrame {
        source_mac,
        rssi: payload[RSSI_OFFSET] as i8,
        csi: &payload[CSI_OFFSET..],
    })
}

/// Duplicate-capture suppression heuristic.
///
/// A frame counts as a duplicate of the previous one when both timestamps
/// truncate to the same whole second *and* to the same tenth of a second.
/// The reporting firmware re-emits frames in tight bursts; this collapses
/// such bursts to one frame. It is a heuristic, not a guarantee:
/// timestamps 90 ms apart such as `12.95` and `13.04` are still treated as
/// distinct because their whole seconds differ.
pub fn is_duplicate(ts: f64, prev_ts: f64) -> bool {
    ts as i64 == prev_ts as i64 && truncate(ts, 1) == truncate(prev_ts, 1)
}

/// Truncate (not round) `x` to `digits` decimal places.
fn truncate(x: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (x * scale).trunc() / scale
}

/// Parse a hardware address given as 12 hex digits, with or without
/// `:` / `-` separators.
pub fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let hex: String = s.chars().filter(|c| !matches!(c, ':' | '-')).collect();
    if hex.len() != 12 {
        return None;
    }
    let mut mac = [0u8; 6];
    for (i, byte) in mac.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).ok()?;
    }
    Some(mac)
}

/// Format a MAC address as a colon-separated hex string.
pub fn format_mac(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: [u8; 6] = [0x5c, 0x02, 0x14, 0xfb, 0x65, 0x52];

    /// Build a minimal Ethernet + IPv4 + UDP frame carrying a CSI report.
    fn make_frame(port: u16, mac: &[u8; 6], csi: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        // Ethernet
        frame.extend_from_slice(&[0xff; 6]); // dst
        frame.extend_from_slice(&[0x02; 6]); // src
        frame.extend_from_slice(&0x0800u16.to_be_bytes());
        // IPv4, no options
        let payload_len = CSI_OFFSET + csi.len();
        let ip_len = (MIN_IP_HEADER_LEN + UDP_HEADER_LEN + payload_len) as u16;
        frame.push(0x45);
        frame.push(0);
        frame.extend_from_slice(&ip_len.to_be_bytes());
        frame.extend_from_slice(&[0; 4]); // id + flags/frag
        frame.push(64); // ttl
        frame.push(IP_PROTO_UDP);
        frame.extend_from_slice(&[0; 2]); // checksum
        frame.extend_from_slice(&[10, 0, 0, 1]);
        frame.extend_from_slice(&[10, 0, 0, 2]);
        // UDP
        frame.extend_from_slice(&port.to_be_bytes()); // src port
        frame.extend_from_slice(&port.to_be_bytes()); // dst port
        frame.extend_from_slice(&((UDP_HEADER_LEN + payload_len) as u16).to_be_bytes());
        frame.extend_from_slice(&[0; 2]); // checksum
        // CSI report header
        frame.extend_from_slice(&[0x11, 0x11]); // magic
        frame.push(0xd6); // rssi: -42
        frame.push(0x88); // frame control
        frame.extend_from_slice(mac);
        frame.extend_from_slice(&[0; 8]); // seq + config + chanspec + chip
        frame.extend_from_slice(csi);
        frame
    }

    #[test]
    fn test_accepts_matching_frame() {
        let csi = [1u8, 0, 2, 0, 3, 0, 4, 0];
        let frame = make_frame(5500, &TARGET, &csi);
        let parsed = parse_frame(&frame, 5500, &TARGET).expect("frame should be accepted");
        assert_eq!(parsed.source_mac, TARGET);
        assert_eq!(parsed.rssi, -42);
        assert_eq!(parsed.csi, &csi);
    }

    #[test]
    fn test_rejects_wrong_port() {
        let frame = make_frame(5501, &TARGET, &[0; 8]);
        assert!(parse_frame(&frame, 5500, &TARGET).is_none());
    }

    #[test]
    fn test_rejects_wrong_source() {
        let frame = make_frame(5500, &[0xaa; 6], &[0; 8]);
        assert!(parse_frame(&frame, 5500, &TARGET).is_none());
    }

    #[test]
    fn test_rejects_non_ipv4() {
        let mut frame = make_frame(5500, &TARGET, &[0; 8]);
        frame[12] = 0x08;
        frame[13] = 0x06; // ARP
        assert!(parse_frame(&frame, 5500, &TARGET).is_none());
    }

    #[test]
    fn test_rejects_every_truncated_header() {
        // Any frame cut short of the full header stack must be rejected,
        // and none of the cuts may panic.
        let frame = make_frame(5500, &TARGET, &[0; 8]);
        let header_len = ETH_HEADER_LEN + MIN_IP_HEADER_LEN + UDP_HEADER_LEN + CSI_OFFSET;
        for len in 0..header_len {
            assert!(parse_frame(&frame[..len], 5500, &TARGET).is_none());
        }
    }

    #[test]
    fn test_duplicate_timestamps() {
        assert!(is_duplicate(12.34, 12.34));
        assert!(is_duplicate(12.34, 12.39)); // same second, same tenth
        assert!(!is_duplicate(12.34, 12.44)); // tenths differ
        assert!(!is_duplicate(13.34, 12.34)); // seconds differ
    }

    #[test]
    fn test_duplicate_heuristic_edge() {
        // 90 ms apart but spanning a whole-second boundary: the heuristic
        // keeps both. This is the documented rule, not a correctness claim.
        assert!(!is_duplicate(13.04, 12.95));
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("5c0214fb6552"), Some(TARGET));
        assert_eq!(parse_mac("5c:02:14:fb:65:52"), Some(TARGET));
        assert_eq!(parse_mac("5C-02-14-FB-65-52"), Some(TARGET));
        assert_eq!(parse_mac("5c0214fb65"), None);
        assert_eq!(parse_mac("not a mac!!"), None);
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac(&TARGET), "5c:02:14:fb:65:52");
    }
}
