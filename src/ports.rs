use facet::Facet;

use crate::error::MacpineError;

/// A host port forwarded into the guest.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct PortForward {
    pub host: u16,
    pub guest: u16,
    #[facet(default)]
    pub udp: bool,
}

impl PortForward {
    /// QEMU user-mode `hostfwd` rule for this forward.
    pub fn hostfwd(&self) -> String {
        let proto = if self.udp { "udp" } else { "tcp" };
        format!("hostfwd={proto}::{}-:{}", self.host, self.guest)
    }
}

/// Parse a comma-separated port list.
///
/// Each entry is `HOST[:GUEST]` with an optional trailing `u` for UDP, e.g.
/// `"8080,9000:90u"`. Empty input means no extra forwards.
pub fn parse_ports(s: &str) -> Result<Vec<PortForward>, MacpineError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }

    s.split(',').map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> Result<PortForward, MacpineError> {
    let (mapping, udp) = match entry.strip_suffix('u') {
        Some(rest) => (rest, true),
        None => (entry, false),
    };

    let (host, guest) = match mapping.split_once(':') {
        Some((h, g)) => (parse_port(h, entry)?, parse_port(g, entry)?),
        None => {
            let p = parse_port(mapping, entry)?;
            (p, p)
        }
    };

    Ok(PortForward { host, guest, udp })
}

fn parse_port(s: &str, entry: &str) -> Result<u16, MacpineError> {
    s.parse::<u16>().map_err(|_| {
        MacpineError::validation(
            "port",
            format!("'{entry}' is not a valid port mapping (use HOST[:GUEST][u], 0-65535)"),
        )
    })
}
