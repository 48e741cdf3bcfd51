//! ARP-based discovery of candidate target devices.
//!
//! Broadcasts a who-has request for every host in an IPv4 range, then
//! collects replies for a fixed wait and prints the observed
//! `(ip, hardware address)` pairs. Runs ahead of a capture session so the
//! operator can pick the address the capture filter keys on — never during
//! one.

use std::collections::HashSet;
use std::error::Error;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use colored::Colorize;
use pcap::{Capture, Device};

use crate::filter;

/// One ARP reply: a live host on the scanned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor {
    pub ip: Ipv4Addr,
    pub mac: [u8; 6],
}

const ETHERTYPE_ARP: u16 = 0x0806;
const ETHERTYPE_IPV4: u16 = 0x0800;
const ARP_FRAME_LEN: usize = 42;
const ARP_OP_REQUEST: u16 = 1;
const ARP_OP_REPLY: u16 = 2;

/// Sweep `cidr` from `iface`, waiting `wait` for replies after the last
/// request goes out. Returns the deduplicated neighbors in reply order.
pub fn scan(iface: &str, cidr: &str, wait: Duration) -> Result<Vec<Neighbor>, Box<dyn Error>> {
    let (network, prefix) = parse_cidr(cidr)?;
    let local_ip = interface_ipv4(iface)?;
    let local_mac = interface_mac(iface)?;

    let mut cap = Capture::from_device(Device::from(iface))?
        .promisc(true)
        .snaplen(128)
        .timeout(100)
        .immediate_mode(true)
        .open()?;
    cap.filter("arp", true)?;

    let hosts = host_range(network, prefix);
    log::info!("Sweeping {} hosts on {cidr} via {iface} …", hosts.len());
    for host in hosts {
        cap.sendpacket(build_request(local_mac, local_ip, host))?;
    }

    let mut seen = HashSet::new();
    let mut neighbors = Vec::new();
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        match cap.next_packet() {
            Ok(packet) => {
                if let Some(neighbor) = parse_reply(packet.data) {
                    if neighbor.ip != local_ip && seen.insert(neighbor) {
                        log::debug!(
                            "ARP reply from {} ({})",
                            neighbor.ip,
                            filter::format_mac(&neighbor.mac)
                        );
                        neighbors.push(neighbor);
                    }
                }
            }
            Err(pcap::Error::TimeoutExpired) => {
                // Keep waiting until the deadline.
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(neighbors)
}

/// Print the discovered hosts as a table.
pub fn print_table(neighbors: &[Neighbor]) {
    if neighbors.is_empty() {
        println!("{}", "  No hosts answered.".dimmed());
        return;
    }
    println!(
        "\n{}",
        format!("  ── {} hosts found ──", neighbors.len()).bold().cyan()
    );
    println!("  {:<18} {}", "IP".bold(), "Hardware address".bold());
    for n in neighbors {
        println!(
            "  {:<18} {}",
            n.ip.to_string().green(),
            filter::format_mac(&n.mac).yellow()
        );
    }
    println!();
}

/// Parse `a.b.c.d/prefix`. Prefixes outside /16–/30 are rejected so a typo
/// cannot turn into a multi-million-host sweep.
fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, u8), Box<dyn Error>> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("expected CIDR notation, got {cidr:?}"))?;
    let addr: Ipv4Addr = addr.parse()?;
    let prefix: u8 = prefix.parse()?;
    if !(16..=30).contains(&prefix) {
        return Err(format!("prefix /{prefix} out of supported range /16–/30").into());
    }
    Ok((addr, prefix))
}

/// All host addresses in the range, network and broadcast excluded.
fn host_range(network: Ipv4Addr, prefix: u8) -> Vec<Ipv4Addr> {
    let mask = u32::MAX << (32 - prefix);
    let base = u32::from(network) & mask;
    let broadcast = base | !mask;
    (base + 1..broadcast).map(Ipv4Addr::from).collect()
}

/// Build an Ethernet-broadcast ARP who-has request.
fn build_request(sender_mac: [u8; 6], sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> [u8; ARP_FRAME_LEN] {
    let mut frame = [0u8; ARP_FRAME_LEN];
    frame[0..6].fill(0xff); // broadcast
    frame[6..12].copy_from_slice(&sender_mac);
    frame[12..14].copy_from_slice(&ETHERTYPE_ARP.to_be_bytes());
    frame[14..16].copy_from_slice(&1u16.to_be_bytes()); // htype: Ethernet
    frame[16..18].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes()); // ptype
    frame[18] = 6; // hlen
    frame[19] = 4; // plen
    frame[20..22].copy_from_slice(&ARP_OP_REQUEST.to_be_bytes());
    frame[22..28].copy_from_slice(&sender_mac);
    frame[28..32].copy_from_slice(&sender_ip.octets());
    // target hardware address stays zeroed
    frame[38..42].copy_from_slice(&target_ip.octets());
    frame
}

/// Classify a captured frame as an ARP reply and pull out the sender.
fn parse_reply(data: &[u8]) -> Option<Neighbor> {
    if data.len() < ARP_FRAME_LEN {
        return None;
    }
    if u16::from_be_bytes([data[12], data[13]]) != ETHERTYPE_ARP {
        return None;
    }
    if u16::from_be_bytes([data[20], data[21]]) != ARP_OP_REPLY {
        return None;
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[22..28]);
    let ip = Ipv4Addr::new(data[28], data[29], data[30], data[31]);
    Some(Neighbor { ip, mac })
}

/// First IPv4 address bound to a local interface, via libpcap.
fn interface_ipv4(iface: &str) -> Result<Ipv4Addr, Box<dyn Error>> {
    let device = Device::list()?
        .into_iter()
        .find(|d| d.name == iface)
        .ok_or_else(|| format!("interface {iface} not found"))?;
    device
        .addresses
        .iter()
        .find_map(|a| match a.addr {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| format!("no IPv4 address on {iface}").into())
}

/// Hardware address of a local interface.
#[cfg(target_os = "linux")]
fn interface_mac(iface: &str) -> io::Result<[u8; 6]> {
    let raw = std::fs::read_to_string(format!("/sys/class/net/{iface}/address"))?;
    filter::parse_mac(raw.trim()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unparseable address for {iface}: {raw:?}"),
        )
    })
}

/// Hardware address of a local interface, from `ifconfig` output.
#[cfg(not(target_os = "linux"))]
fn interface_mac(iface: &str) -> io::Result<[u8; 6]> {
    let output = std::process::Command::new("ifconfig").arg(iface).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("`ifconfig {iface}` failed: {stderr}"),
        ));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("ether ") {
            if let Some(mac) = filter::parse_mac(rest.split_whitespace().next().unwrap_or("")) {
                return Ok(mac);
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no hardware address found for {iface}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        assert_eq!(
            parse_cidr("192.168.1.0/24").unwrap(),
            (Ipv4Addr::new(192, 168, 1, 0), 24)
        );
        assert!(parse_cidr("192.168.1.0").is_err());
        assert!(parse_cidr("192.168.1.0/8").is_err()); // too wide
        assert!(parse_cidr("192.168.1.0/31").is_err());
        assert!(parse_cidr("not-an-ip/24").is_err());
    }

    #[test]
    fn test_host_range() {
        let hosts = host_range(Ipv4Addr::new(192, 168, 1, 77), 24);
        assert_eq!(hosts.len(), 254);
        assert_eq!(hosts[0], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(hosts[253], Ipv4Addr::new(192, 168, 1, 254));
        assert!(!hosts.contains(&Ipv4Addr::new(192, 168, 1, 0)));
        assert!(!hosts.contains(&Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn test_request_is_not_a_reply() {
        let frame = build_request(
            [0xaa; 6],
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        assert!(parse_reply(&frame).is_none());
    }

    #[test]
    fn test_parse_reply() {
        // A reply mirrors the request layout with opcode 2 and the
        // answering host in the sender slots.
        let mut frame = build_request(
            [0xaa; 6],
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        );
        frame[20..22].copy_from_slice(&ARP_OP_REPLY.to_be_bytes());
        frame[22..28].copy_from_slice(&[0xbb; 6]);
        frame[28..32].copy_from_slice(&Ipv4Addr::new(10, 0, 0, 2).octets());

        let neighbor = parse_reply(&frame).expect("reply should parse");
        assert_eq!(neighbor.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(neighbor.mac, [0xbb; 6]);
        assert!(parse_reply(&frame[..20]).is_none());
    }
}
