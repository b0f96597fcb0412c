//! Field validation for virtual server definitions.
//!
//! Checks collect every violation instead of stopping at the first one, so the
//! console can mark all offending form fields in a single round trip.

use crate::error::Violation;
use crate::registry::types::{Timeouts, VirtualServerSpec};
use crate::utils::validation::{is_empty_or_whitespace, parse_backend_addr, validate_port_range};

pub(crate) const MAX_NAME_LEN: usize = 64;

/// Check every field of a definition. An empty result means the definition is storable.
pub(crate) fn check_definition(spec: &VirtualServerSpec) -> Vec<Violation> {
    let mut violations = Vec::new();

    if is_empty_or_whitespace(&spec.name) {
        violations.push(Violation::new("name", "Name must not be empty"));
    } else if spec.name.trim().len() > MAX_NAME_LEN {
        violations.push(Violation::new("name", format!("Name must be at most {} characters", MAX_NAME_LEN)));
    }

    if let Err(message) = validate_port_range(spec.port) {
        violations.push(Violation::new("port", message));
    }

    if spec.backends.is_empty() {
        violations.push(Violation::new("backends", "At least one backend is required"));
    }
    for entry in &spec.backends {
        if let Err(message) = parse_backend_addr(entry) {
            violations.push(Violation::new("backends", message));
        }
    }

    if spec.max_conn == 0 {
        violations.push(Violation::new("maxConn", "Max connections must be at least 1"));
    }
    if spec.max_queue == 0 {
        violations.push(Violation::new("maxQueue", "Max queue must be at least 1"));
    }

    check_timeouts(&spec.timeouts, &mut violations);

    violations
}

fn check_timeouts(timeouts: &Timeouts, violations: &mut Vec<Violation>) {
    let fields = [
        ("timeouts.connect", timeouts.connect),
        ("timeouts.client", timeouts.client),
        ("timeouts.server", timeouts.server),
        ("timeouts.queue", timeouts.queue),
    ];
    for (field, value) in fields {
        if value == 0 {
            violations.push(Violation::new(field, "Timeout must be at least 1 second"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::{BalanceAlgorithm, ListenerMode};

    fn valid_spec() -> VirtualServerSpec {
        VirtualServerSpec {
            name: "App-Cluster-Main".to_string(),
            port: 443,
            mode: ListenerMode::Https,
            balance: BalanceAlgorithm::Roundrobin,
            backends: vec!["10.0.1.5:8080".to_string(), "10.0.1.6:8080".to_string()],
            max_conn: 5000,
            max_queue: 200,
            timeouts: Timeouts::default(),
        }
    }

    #[test]
    fn test_valid_spec_has_no_violations() {
        assert!(check_definition(&valid_spec()).is_empty());
    }

    #[test]
    fn test_empty_name() {
        let mut spec = valid_spec();
        spec.name = "   ".to_string();
        let violations = check_definition(&spec);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");
    }

    #[test]
    fn test_name_too_long() {
        let mut spec = valid_spec();
        spec.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(check_definition(&spec)[0].message.contains("at most"));
    }

    #[test]
    fn test_empty_backend_pool() {
        let mut spec = valid_spec();
        spec.backends.clear();
        let violations = check_definition(&spec);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "backends");
        assert!(violations[0].message.contains("At least one backend"));
    }

    #[test]
    fn test_malformed_backend_entry_is_named() {
        let mut spec = valid_spec();
        spec.backends = vec!["10.0.1.5:8080".to_string(), "not-an-address".to_string()];
        let violations = check_definition(&spec);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "backends");
        assert!(violations[0].message.contains("not-an-address"));
    }

    #[test]
    fn test_all_violations_are_collected() {
        let spec = VirtualServerSpec {
            name: "".to_string(),
            port: 0,
            mode: ListenerMode::Http,
            balance: BalanceAlgorithm::Roundrobin,
            backends: vec![],
            max_conn: 0,
            max_queue: 0,
            timeouts: Timeouts { connect: 0, client: 30, server: 30, queue: 30 },
        };
        let violations = check_definition(&spec);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "port", "backends", "maxConn", "maxQueue", "timeouts.connect"]);
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut spec = valid_spec();
        spec.timeouts = Timeouts { connect: 5, client: 0, server: 30, queue: 0 };
        let violations = check_definition(&spec);
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["timeouts.client", "timeouts.queue"]);
    }
}
