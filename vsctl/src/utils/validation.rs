//! Common validation utilities shared across modules

use std::net::Ipv4Addr;

/// Validate that a port number is in valid range (1-65535)
pub fn validate_port_range(port: u16) -> Result<(), String> {
    if port == 0 {
        return Err("Port must be between 1 and 65535".to_string());
    }
    Ok(())
}

/// Check if a string is empty or only whitespace
pub fn is_empty_or_whitespace(s: &str) -> bool {
    s.trim().is_empty()
}

/// Parse a backend pool entry of the form `IPv4:port` (e.g. `10.0.1.5:8080`).
/// The error message names the offending part so it can be surfaced verbatim.
pub fn parse_backend_addr(entry: &str) -> Result<(Ipv4Addr, u16), String> {
    let entry = entry.trim();
    let Some((host, port)) = entry.split_once(':') else {
        return Err(format!("'{}' is missing a port (expected IP:port, e.g. 192.168.1.1:8080)", entry));
    };
    let host: Ipv4Addr = host.parse().map_err(|_| format!("'{}' is not a valid IPv4 address", host))?;
    let port: u16 = port.parse().map_err(|_| format!("'{}' is not a valid port number", port))?;
    validate_port_range(port).map_err(|e| format!("'{}': {}", entry, e))?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_range_valid() {
        assert!(validate_port_range(1).is_ok());
        assert!(validate_port_range(80).is_ok());
        assert!(validate_port_range(443).is_ok());
        assert!(validate_port_range(8080).is_ok());
        assert!(validate_port_range(65535).is_ok());
    }

    #[test]
    fn test_validate_port_range_invalid() {
        assert!(validate_port_range(0).is_err());
        assert_eq!(validate_port_range(0).unwrap_err(), "Port must be between 1 and 65535");
    }

    #[test]
    fn test_is_empty_or_whitespace() {
        assert!(is_empty_or_whitespace(""));
        assert!(is_empty_or_whitespace("   "));
        assert!(is_empty_or_whitespace("\t"));
        assert!(is_empty_or_whitespace("  \t\n  "));
        assert!(!is_empty_or_whitespace("hello"));
        assert!(!is_empty_or_whitespace("  hello  "));
    }

    #[test]
    fn test_parse_backend_addr_valid() {
        assert_eq!(parse_backend_addr("10.0.1.5:8080").unwrap(), ("10.0.1.5".parse().unwrap(), 8080));
        assert_eq!(parse_backend_addr("192.168.0.10:80").unwrap(), ("192.168.0.10".parse().unwrap(), 80));
        assert_eq!(parse_backend_addr(" 127.0.0.1:65535 ").unwrap(), ("127.0.0.1".parse().unwrap(), 65535));
    }

    #[test]
    fn test_parse_backend_addr_missing_port() {
        let err = parse_backend_addr("10.0.1.5").unwrap_err();
        assert!(err.contains("missing a port"));
        assert!(err.contains("10.0.1.5"));
    }

    #[test]
    fn test_parse_backend_addr_bad_host() {
        assert!(parse_backend_addr("backend-1:8080").unwrap_err().contains("not a valid IPv4 address"));
        assert!(parse_backend_addr("256.0.0.1:8080").unwrap_err().contains("not a valid IPv4 address"));
        assert!(parse_backend_addr("10.0.1:8080").unwrap_err().contains("not a valid IPv4 address"));
    }

    #[test]
    fn test_parse_backend_addr_bad_port() {
        assert!(parse_backend_addr("10.0.1.5:http").unwrap_err().contains("not a valid port number"));
        assert!(parse_backend_addr("10.0.1.5:99999").unwrap_err().contains("not a valid port number"));
        assert!(parse_backend_addr("10.0.1.5:0").unwrap_err().contains("Port must be between"));
    }
}
