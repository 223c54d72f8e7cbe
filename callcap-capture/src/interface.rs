use pcap::Device;
use tracing::debug;

use crate::CaptureError;

/// Fails unless libpcap can see an interface called `name`.
///
/// Run once at startup: a capture on a missing interface would otherwise
/// only fail later, one call at a time.
pub fn check_interface(name: &str) -> Result<(), CaptureError> {
    let devices = Device::list()?;
    if devices.iter().any(|d| d.name == name) {
        debug!("Capture interface {} present", name);
        Ok(())
    } else {
        Err(CaptureError::InterfaceNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_interface_is_rejected() {
        // Device enumeration itself may be unavailable in a sandbox; either
        // way the interface must not be reported as present.
        assert!(check_interface("callcap-nope0").is_err());
    }
}
