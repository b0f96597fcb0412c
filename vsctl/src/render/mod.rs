//! Deterministic rendering of a virtual server into balancer configuration.
//!
//! The renderer is a pure function of the record: no clocks, no counters, no
//! lookups. The same record always renders to byte-identical output, which is
//! what makes the generated artifacts diffable across runs.

use crate::error::{Error, Result};
use crate::registry::types::{BalanceAlgorithm, ListenerMode, VirtualServer};

/// A rendered configuration artifact plus the filename it should be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub filename: String,
    pub contents: String,
}

/// Render the frontend/backend configuration blocks for a virtual server.
///
/// Field validation happens at the registry boundary; a record failing here
/// bypassed the registry, so the error reports an internal invariant
/// violation rather than bad user input.
pub fn render(server: &VirtualServer) -> Result<RenderedConfig> {
    if server.backends.is_empty() {
        return Err(Error::Render(format!("Virtual server {} reached the renderer with an empty backend pool", server.id)));
    }
    let section = sanitize_name(&server.name);
    if section.is_empty() {
        return Err(Error::Render(format!("Virtual server {} has no usable name", server.id)));
    }

    let with_cookie = server.balance == BalanceAlgorithm::Cookie;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# Virtual server '{}' ({})", server.name, server.id));
    lines.push(String::new());

    lines.push(format!("frontend {}", section));
    match server.mode {
        ListenerMode::Http => lines.push(format!("    bind *:{}", server.port)),
        ListenerMode::Https => lines.push(format!("    bind *:{} ssl crt /etc/vsctl/certs/{}.pem", server.port, section)),
    }
    lines.push("    mode http".to_string());
    lines.push(format!("    maxconn {}", server.max_conn));
    lines.push(format!("    timeout client {}s", server.timeouts.client));
    lines.push(format!("    default_backend {}_pool", section));
    lines.push(String::new());

    lines.push(format!("backend {}_pool", section));
    lines.push("    mode http".to_string());
    lines.push("    balance roundrobin".to_string());
    if with_cookie {
        lines.push("    cookie VSRV insert indirect nocache".to_string());
    }
    lines.push(format!("    timeout connect {}s", server.timeouts.connect));
    lines.push(format!("    timeout server {}s", server.timeouts.server));
    lines.push(format!("    timeout queue {}s", server.timeouts.queue));
    for (index, backend) in server.backends.iter().enumerate() {
        let mut line = format!("    server {}_{} {}", section, index + 1, backend);
        if with_cookie {
            line.push_str(&format!(" cookie {}_{}", section, index + 1));
        }
        line.push_str(&format!(" check maxqueue {}", server.max_queue));
        lines.push(line);
    }

    let contents = format!("{}\n", lines.join("\n"));
    Ok(RenderedConfig { filename: format!("{}.cfg", section), contents })
}

// Section identifiers and filenames: lowercased, anything outside [a-z0-9-_]
// becomes a dash, leading/trailing dashes stripped.
fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
