//! Dispatch keys
//!
//! Closed set of capability tags a value can carry. The numeric value of a key
//! is its dispatch priority: a higher number is consulted first.
//! Key values are a stable contract.

use crate::error::LaminaError;

/// Capability tag consulted by the dispatcher.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DispatchKey {
    // Backends
    Xla  = 0x00,
    Cuda = 0x01,
    Cpu  = 0x02,

    // Differentiation
    AutogradXla  = 0x03,
    AutogradCuda = 0x04,
    AutogradCpu  = 0x05,

    // Wrappers
    GradWrapper = 0x06,
    Batched     = 0x07,

    // Installed by transform drivers while a layer is active
    TransformFront = 0x08,
}

impl DispatchKey {
    /// Every key, lowest priority first.
    pub const ALL: [DispatchKey; 9] = [
        DispatchKey::Xla,
        DispatchKey::Cuda,
        DispatchKey::Cpu,
        DispatchKey::AutogradXla,
        DispatchKey::AutogradCuda,
        DispatchKey::AutogradCpu,
        DispatchKey::GradWrapper,
        DispatchKey::Batched,
        DispatchKey::TransformFront,
    ];

    /// Convert raw byte to key
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    pub fn is_backend(self) -> bool {
        matches!(self, DispatchKey::Cpu | DispatchKey::Cuda | DispatchKey::Xla)
    }

    pub fn is_autograd(self) -> bool {
        matches!(
            self,
            DispatchKey::AutogradCpu | DispatchKey::AutogradCuda | DispatchKey::AutogradXla
        )
    }
}

impl TryFrom<u8> for DispatchKey {
    type Error = LaminaError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        DispatchKey::from_u8(byte).ok_or(LaminaError::InvalidKey(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip_covers_every_key() {
        for key in DispatchKey::ALL {
            assert_eq!(DispatchKey::from_u8(key as u8), Some(key));
        }
        assert_eq!(DispatchKey::from_u8(0x09), None);
        assert_eq!(DispatchKey::try_from(0x09), Err(LaminaError::InvalidKey(0x09)));
    }

    #[test]
    fn wrappers_outrank_backends() {
        assert!(DispatchKey::GradWrapper > DispatchKey::AutogradCpu);
        assert!(DispatchKey::Batched > DispatchKey::GradWrapper);
        assert!(DispatchKey::TransformFront > DispatchKey::Batched);
    }
}
