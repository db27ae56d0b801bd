//! Wrapped values
//!
//! A `WrappedValue` tags an inner value with the level that created it and a
//! handle to that level's liveness flag. Once the level is popped the wrapper
//! is dead and decays to its inner value on the next operator that sees it.
//!
//! Layout (sizes, strides, offset) is mirrored from the inner value and is
//! never a source of truth: it is recomputed whenever the inner value changes
//! and cannot be set directly.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{LaminaError, LaminaResult};
use crate::keys::{self, KeySet};
use crate::level::Level;
use crate::liveness::LivenessHandle;
use crate::tensor::{Device, Dims};

use super::Value;

static NEXT_WRAPPER_ID: AtomicU64 = AtomicU64::new(1);

/// How a new wrapper learns whether its level is alive.
#[derive(Debug, Clone)]
pub enum Liveness {
    /// Share the level's flag and follow its future transitions.
    Attached(LivenessHandle),
    /// Own a fresh flag fixed at the given state.
    Detached(bool),
}

impl From<LivenessHandle> for Liveness {
    fn from(handle: LivenessHandle) -> Self {
        Liveness::Attached(handle)
    }
}

/// Level-tagged proxy over exactly one inner value.
///
/// `Clone` duplicates the proxy as a value of the same level: the copy keeps
/// the id and follows the same liveness flag. Use
/// [`WrappedValue::shallow_copy_and_detach`] for a copy that stops tracking
/// the level.
#[derive(Debug, Clone)]
pub struct WrappedValue {
    id: u64,
    value: Box<Value>,
    level: Level,
    liveness: LivenessHandle,
    keys: KeySet,
    force_autograd: bool,

    // Mirrored from `value`
    sizes: Dims,
    strides: Dims,
    storage_offset: usize,
    numel: usize,
    is_contiguous: bool,

    version: u64,
    allow_metadata_change: bool,
}

impl WrappedValue {
    /// Wrap `value` for `level`, forcing the differentiation keys on.
    pub fn new(value: Value, level: Level, liveness: impl Into<Liveness>) -> LaminaResult<Self> {
        Self::with_key_policy(value, level, liveness, true)
    }

    /// Wrap `value` for `level`. `force_autograd` controls whether the
    /// differentiation keys are added regardless of the inner value's keys.
    pub fn with_key_policy(
        value: Value,
        level: Level,
        liveness: impl Into<Liveness>,
        force_autograd: bool,
    ) -> LaminaResult<Self> {
        if !value.is_defined() {
            return Err(LaminaError::UndefinedValue);
        }
        // A dead inner wrapper has no level left to compare against.
        if let Some(inner_level) = value.as_wrapper().and_then(WrappedValue::level) {
            if inner_level >= level {
                return Err(LaminaError::LevelNotIncreasing { inner: inner_level, outer: level });
            }
        }

        let keys = keys::wrapper_key_set(value.key_set(), force_autograd);
        let liveness = match liveness.into() {
            Liveness::Attached(handle) => handle,
            Liveness::Detached(alive) => LivenessHandle::detached(alive),
        };

        let mut wrapped = WrappedValue {
            id: NEXT_WRAPPER_ID.fetch_add(1, Ordering::Relaxed),
            value: Box::new(value),
            level,
            liveness,
            keys,
            force_autograd,
            sizes: Dims::new(),
            strides: Dims::new(),
            storage_offset: 0,
            numel: 0,
            is_contiguous: true,
            version: 0,
            allow_metadata_change: true,
        };
        wrapped.refresh_metadata();
        Ok(wrapped)
    }

    /// Process-unique identity of this proxy.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        *self.value
    }

    /// The wrapper's level, or `None` once its level has been popped.
    pub fn level(&self) -> Option<Level> {
        self.is_alive().then_some(self.level)
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn liveness(&self) -> &LivenessHandle {
        &self.liveness
    }

    pub fn key_set(&self) -> KeySet {
        self.keys
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn storage_offset(&self) -> usize {
        self.storage_offset
    }

    pub fn numel(&self) -> usize {
        self.numel
    }

    pub fn is_contiguous(&self) -> bool {
        self.is_contiguous
    }

    pub fn device(&self) -> Option<Device> {
        self.value.device()
    }

    /// Number of in-place mutations applied through this wrapper.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn allows_metadata_change(&self) -> bool {
        self.allow_metadata_change
    }

    pub fn type_name(&self) -> &'static str {
        "WrappedValue"
    }

    pub(crate) fn refresh_metadata(&mut self) {
        self.sizes = self.value.shape();
        self.strides = self.value.strides();
        self.storage_offset = self.value.storage_offset();
        self.numel = self.value.numel();
        self.is_contiguous = self.value.is_contiguous();
    }

    pub fn set_size(&mut self, _dim: usize, _size: usize) -> LaminaResult<()> {
        Err(LaminaError::LayoutMutation("set_size"))
    }

    pub fn set_stride(&mut self, _dim: usize, _stride: usize) -> LaminaResult<()> {
        Err(LaminaError::LayoutMutation("set_stride"))
    }

    pub fn set_storage_offset(&mut self, _offset: usize) -> LaminaResult<()> {
        Err(LaminaError::LayoutMutation("set_storage_offset"))
    }

    /// Wrappers have no storage of their own; go through `value()`.
    pub fn storage(&self) -> LaminaResult<&[f64]> {
        Err(LaminaError::StorageAccess)
    }

    /// Copy of this wrapper with the same level and current liveness that no
    /// longer follows the level's flag. Keys are recomputed from the inner
    /// value exactly as at construction.
    pub fn shallow_copy_and_detach(&self, version: u64, allow_metadata_change: bool) -> WrappedValue {
        let keys = keys::wrapper_key_set(self.value.key_set(), self.force_autograd);
        WrappedValue {
            id: NEXT_WRAPPER_ID.fetch_add(1, Ordering::Relaxed),
            value: self.value.clone(),
            level: self.level,
            liveness: LivenessHandle::detached(self.is_alive()),
            keys,
            force_autograd: self.force_autograd,
            sizes: self.sizes.clone(),
            strides: self.strides.clone(),
            storage_offset: self.storage_offset,
            numel: self.numel,
            is_contiguous: self.is_contiguous,
            version,
            allow_metadata_change,
        }
    }

    /// Overwrite this wrapper's state from another wrapper.
    pub fn shallow_copy_from(&mut self, _src: &WrappedValue) -> LaminaResult<()> {
        Err(LaminaError::NotImplemented("shallow_copy_from"))
    }

    /// Move the inner value out, leaving `Undefined` until restored.
    pub(crate) fn take_value(&mut self) -> Value {
        std::mem::replace(&mut *self.value, Value::Undefined)
    }

    /// Put an inner value back after `take_value`.
    pub(crate) fn restore_value(&mut self, value: Value, mutated: bool) {
        *self.value = value;
        if mutated {
            self.version += 1;
        }
        self.refresh_metadata();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::DispatchKey;
    use crate::liveness::LifeOwner;
    use crate::tensor::Tensor;
    use crate::value::BatchedValue;

    fn plain(shape: &[usize]) -> Value {
        Tensor::zeros(shape).unwrap().into()
    }

    #[test]
    fn construction_mirrors_layout_and_adds_wrapper_key() {
        let owner = LifeOwner::new();
        let w = WrappedValue::new(plain(&[2, 3]), Level(1), owner.handle()).unwrap();
        assert_eq!(w.sizes(), &[2, 3]);
        assert_eq!(w.strides(), &[3, 1]);
        assert_eq!(w.storage_offset(), 0);
        assert_eq!(w.numel(), 6);
        assert!(w.is_contiguous());
        assert!(w.key_set().has(DispatchKey::GradWrapper));
        assert!(w.key_set().has(DispatchKey::AutogradCuda));
        assert_eq!(w.level(), Some(Level(1)));
        assert_eq!(w.type_name(), "WrappedValue");
    }

    #[test]
    fn layout_of_batched_inner_value_is_mirrored() {
        let batched = BatchedValue::new(plain(&[4, 3]), Level(1), 1).unwrap();
        let w = WrappedValue::new(batched.into(), Level(2), Liveness::Detached(true)).unwrap();
        assert_eq!(w.sizes(), &[4]);
        assert_eq!(w.strides(), &[3]);
        assert_eq!(w.numel(), 4);
        assert!(!w.is_contiguous());

        let copy = w.shallow_copy_and_detach(0, true);
        assert_eq!(copy.numel(), 4);
        assert!(!copy.is_contiguous());
    }

    #[test]
    fn undefined_value_is_rejected() {
        let err = WrappedValue::new(Value::Undefined, Level(1), Liveness::Detached(true)).unwrap_err();
        assert_eq!(err, LaminaError::UndefinedValue);
        assert!(err.is_internal());
    }

    #[test]
    fn nesting_must_increase_level() {
        let inner = WrappedValue::new(plain(&[1]), Level(2), Liveness::Detached(true)).unwrap();
        let err = WrappedValue::new(inner.clone().into(), Level(2), Liveness::Detached(true)).unwrap_err();
        assert_eq!(err, LaminaError::LevelNotIncreasing { inner: Level(2), outer: Level(2) });

        let outer = WrappedValue::new(inner.into(), Level(3), Liveness::Detached(true)).unwrap();
        assert_eq!(outer.value().as_wrapper().and_then(WrappedValue::level), Some(Level(2)));
    }

    #[test]
    fn dead_inner_wrapper_can_be_rewrapped_at_any_level() {
        let owner = LifeOwner::new();
        let inner = WrappedValue::new(plain(&[1]), Level(2), owner.handle()).unwrap();
        owner.kill();
        assert!(WrappedValue::new(inner.into(), Level(1), Liveness::Detached(true)).is_ok());
    }

    #[test]
    fn level_disappears_when_popped() {
        let owner = LifeOwner::new();
        let w = WrappedValue::new(plain(&[1]), Level(4), owner.handle()).unwrap();
        owner.kill();
        assert!(!w.is_alive());
        assert_eq!(w.level(), None);
    }

    #[test]
    fn detach_snapshots_liveness() {
        let owner = LifeOwner::new();
        let w = WrappedValue::new(plain(&[2]), Level(1), owner.handle()).unwrap();
        let copy = w.shallow_copy_and_detach(7, false);
        owner.kill();

        assert!(!w.is_alive());
        assert!(copy.is_alive());
        assert_eq!(copy.level(), Some(Level(1)));
        assert_eq!(copy.key_set(), w.key_set());
        assert_ne!(copy.id(), w.id());
        assert_eq!(copy.version(), 7);
        assert!(!copy.allows_metadata_change());
    }

    #[test]
    fn detach_of_dead_wrapper_stays_dead() {
        let w = WrappedValue::new(plain(&[2]), Level(1), Liveness::Detached(false)).unwrap();
        let copy = w.shallow_copy_and_detach(0, true);
        assert!(!copy.is_alive());
        assert_eq!(copy.level(), None);
    }

    #[test]
    fn layout_and_storage_are_not_settable() {
        let mut w = WrappedValue::new(plain(&[2]), Level(1), Liveness::Detached(true)).unwrap();
        assert_eq!(w.set_size(0, 5), Err(LaminaError::LayoutMutation("set_size")));
        assert_eq!(w.set_stride(0, 5), Err(LaminaError::LayoutMutation("set_stride")));
        assert_eq!(
            w.set_storage_offset(1),
            Err(LaminaError::LayoutMutation("set_storage_offset"))
        );
        assert_eq!(w.storage(), Err(LaminaError::StorageAccess));
        assert_eq!(w.sizes(), &[2]);
    }

    #[test]
    fn shallow_copy_from_is_not_implemented() {
        let mut a = WrappedValue::new(plain(&[2]), Level(1), Liveness::Detached(true)).unwrap();
        let b = WrappedValue::new(plain(&[2]), Level(1), Liveness::Detached(true)).unwrap();
        let err = a.shallow_copy_from(&b).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn restore_refreshes_layout_and_version() {
        let mut w = WrappedValue::new(plain(&[2]), Level(1), Liveness::Detached(true)).unwrap();
        let _old = w.take_value();
        w.restore_value(plain(&[4, 1]), true);
        assert_eq!(w.sizes(), &[4, 1]);
        assert_eq!(w.numel(), 4);
        assert_eq!(w.version(), 1);
    }
}
