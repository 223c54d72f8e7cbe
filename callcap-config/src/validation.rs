// callcap-config/src/validation.rs
//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration modules.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref INTERFACE_RE: Regex = Regex::new("^[a-zA-Z0-9_.:-]+$").unwrap();
}

/// Validate that an interface name follows Linux naming conventions.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    if !name.is_empty() && name.len() <= 15 && INTERFACE_RE.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate capture protocol. Only the transports tcpdump can filter by port.
pub fn validate_protocol(protocol: &str) -> Result<(), ValidationError> {
    match protocol {
        "udp" | "tcp" => Ok(()),
        _ => Err(ValidationError::new("invalid_capture_protocol")),
    }
}

/// Validate every monitored number. Caller ids may be SIP user parts, so
/// anything non-empty without whitespace or control characters is accepted.
pub fn validate_numbers(numbers: &[String]) -> Result<(), ValidationError> {
    let plausible = |n: &String| {
        !n.is_empty() && !n.chars().any(|c| c.is_whitespace() || c.is_control())
    };
    if numbers.iter().all(plausible) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

/// Validate log level.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interfaces() {
        assert!(validate_interface("eth0").is_ok());
        assert!(validate_interface("bond0.100").is_ok());
        assert!(validate_interface("any").is_ok());
        assert!(validate_interface("").is_err());
        assert!(validate_interface("eth0; rm -rf /").is_err());
        assert!(validate_interface("averyveryverylongname").is_err());
    }

    #[test]
    fn numbers() {
        assert!(validate_numbers(&["18682099276".into(), "+4687654321".into()]).is_ok());
        assert!(validate_numbers(&["".into()]).is_err());
        assert!(validate_numbers(&["alice".into(), "1000-sales".into()]).is_ok());
        assert!(validate_numbers(&["12 34".into()]).is_err());
        assert!(validate_numbers(&["12\t34".into()]).is_err());
    }

    #[test]
    fn protocols() {
        assert!(validate_protocol("udp").is_ok());
        assert!(validate_protocol("tcp").is_ok());
        assert!(validate_protocol("sctp").is_err());
    }
}
