//! Capability keys and wrapper key propagation.

pub mod key;
pub mod set;

pub use key::DispatchKey;
pub use set::KeySet;

/// Keys a wrapper inherits from the value it wraps.
pub const PROPAGATE_TO_WRAPPER: KeySet = KeySet::from_keys(&[
    DispatchKey::Cpu,
    DispatchKey::Cuda,
    DispatchKey::Xla,
    DispatchKey::AutogradCpu,
    DispatchKey::AutogradCuda,
    DispatchKey::AutogradXla,
]);

/// Differentiation keys, forced onto every wrapper when enabled.
pub const AUTOGRAD_KEYS: KeySet = KeySet::from_keys(&[
    DispatchKey::AutogradCpu,
    DispatchKey::AutogradCuda,
    DispatchKey::AutogradXla,
]);

/// Key set a new wrapper over a value carrying `source` must advertise.
///
/// Used by both construction and shallow copies, so a copy of a wrapper
/// intercepts exactly the same operators as the original.
pub fn wrapper_key_set(source: KeySet, force_autograd: bool) -> KeySet {
    let mut keys = source.intersection(PROPAGATE_TO_WRAPPER);
    if force_autograd {
        keys = keys.union(AUTOGRAD_KEYS);
    }
    keys.add(DispatchKey::GradWrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_keys_drop_unlisted_and_force_autograd() {
        let source = KeySet::from_keys(&[DispatchKey::Cuda, DispatchKey::Batched, DispatchKey::TransformFront]);
        let keys = wrapper_key_set(source, true);
        assert!(keys.has(DispatchKey::GradWrapper));
        assert!(keys.has(DispatchKey::Cuda));
        assert!(keys.has(DispatchKey::AutogradCpu));
        assert!(keys.has(DispatchKey::AutogradXla));
        assert!(!keys.has(DispatchKey::Batched));
        assert!(!keys.has(DispatchKey::TransformFront));
    }

    #[test]
    fn without_forcing_only_inherited_autograd_survives() {
        let source = KeySet::from_keys(&[DispatchKey::Cpu, DispatchKey::AutogradCpu]);
        let keys = wrapper_key_set(source, false);
        assert_eq!(
            keys,
            KeySet::from_keys(&[DispatchKey::Cpu, DispatchKey::AutogradCpu, DispatchKey::GradWrapper])
        );
    }

    #[test]
    fn propagated_keys_are_backends_and_autograd() {
        let backends: KeySet = DispatchKey::ALL.into_iter().filter(|k| k.is_backend()).collect();
        let autograd: KeySet = DispatchKey::ALL.into_iter().filter(|k| k.is_autograd()).collect();
        assert_eq!(autograd, AUTOGRAD_KEYS);
        assert_eq!(backends.union(autograd), PROPAGATE_TO_WRAPPER);
        assert!(backends.intersection(autograd).is_empty());
    }
}
