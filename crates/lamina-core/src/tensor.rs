//! Plain tensor values
//!
//! The opaque numeric value the runtime wraps. Dense, row-major, `f64`.
//! Shape, strides and offset are exposed read-only so wrappers can mirror them.

use smallvec::SmallVec;

use crate::error::{LaminaError, LaminaResult};
use crate::keys::{DispatchKey, KeySet};

pub type Dims = SmallVec<[usize; 4]>;

/// Device a tensor lives on. Selects its backend keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda,
    Xla,
}

impl Device {
    pub fn key_set(self) -> KeySet {
        match self {
            Device::Cpu => KeySet::from_keys(&[DispatchKey::Cpu, DispatchKey::AutogradCpu]),
            Device::Cuda => KeySet::from_keys(&[DispatchKey::Cuda, DispatchKey::AutogradCuda]),
            Device::Xla => KeySet::from_keys(&[DispatchKey::Xla, DispatchKey::AutogradXla]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f64>,
    shape: Dims,
    strides: Dims,
    storage_offset: usize,
    device: Device,
}

fn contiguous_strides(shape: &[usize]) -> LaminaResult<Dims> {
    let mut strides: Dims = SmallVec::from_elem(1, shape.len());
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1]
            .checked_mul(shape[i + 1])
            .ok_or_else(|| LaminaError::ShapeOverflow(shape.to_vec()))?;
    }
    Ok(strides)
}

/// Element count of `shape`. The product of the non-zero dims must fit a
/// `usize` even when some dim is zero, so every sub-shape has a valid count.
pub fn checked_numel(shape: &[usize]) -> LaminaResult<usize> {
    let nonzero = shape
        .iter()
        .filter(|&&d| d != 0)
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .ok_or_else(|| LaminaError::ShapeOverflow(shape.to_vec()))?;
    Ok(if shape.contains(&0) { 0 } else { nonzero })
}

/// Whether `strides` lay `shape` out densely in row-major order. Size-1 dims
/// may carry any stride; a shape with no elements is always contiguous.
pub fn is_contiguous_layout(shape: &[usize], strides: &[usize]) -> bool {
    if shape.contains(&0) {
        return true;
    }
    let mut expected = 1usize;
    for (&dim, &stride) in shape.iter().zip(strides).rev() {
        if dim != 1 && stride != expected {
            return false;
        }
        expected = expected.saturating_mul(dim);
    }
    true
}

impl Tensor {
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> LaminaResult<Self> {
        let numel = checked_numel(shape)?;
        if numel != data.len() {
            return Err(LaminaError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Tensor {
            data,
            shape: shape.iter().copied().collect(),
            strides: contiguous_strides(shape)?,
            storage_offset: 0,
            device: Device::Cpu,
        })
    }

    pub fn full(shape: &[usize], fill: f64) -> LaminaResult<Self> {
        let numel = checked_numel(shape)?;
        Ok(Tensor {
            data: vec![fill; numel],
            shape: shape.iter().copied().collect(),
            strides: contiguous_strides(shape)?,
            storage_offset: 0,
            device: Device::Cpu,
        })
    }

    pub fn zeros(shape: &[usize]) -> LaminaResult<Self> {
        Self::full(shape, 0.0)
    }

    /// 0-dim tensor holding `value`.
    pub fn scalar(value: f64) -> Self {
        Tensor {
            data: vec![value],
            shape: Dims::new(),
            strides: Dims::new(),
            storage_offset: 0,
            device: Device::Cpu,
        }
    }

    #[must_use]
    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn storage_offset(&self) -> usize {
        self.storage_offset
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous_layout(&self.shape, &self.strides)
    }

    pub fn key_set(&self) -> KeySet {
        self.device.key_set()
    }

    fn check_same_shape(&self, other: &Tensor) -> LaminaResult<()> {
        if self.shape != other.shape {
            return Err(LaminaError::ShapeMismatch {
                expected: self.shape.to_vec(),
                actual: other.shape.to_vec(),
            });
        }
        Ok(())
    }

    fn zip_with(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> LaminaResult<Tensor> {
        self.check_same_shape(other)?;
        let data = self.data.iter().zip(&other.data).map(|(a, b)| f(*a, *b)).collect();
        Ok(Tensor { data, ..self.clone() })
    }

    pub fn add(&self, other: &Tensor) -> LaminaResult<Tensor> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> LaminaResult<Tensor> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor) -> LaminaResult<Tensor> {
        self.zip_with(other, |a, b| a * b)
    }

    pub fn neg(&self) -> Tensor {
        Tensor { data: self.data.iter().map(|x| -x).collect(), ..self.clone() }
    }

    /// Sum of all elements as a 0-dim tensor on the same device.
    pub fn sum(&self) -> Tensor {
        Tensor::scalar(self.data.iter().sum()).to_device(self.device)
    }

    /// In-place copy of `src`'s elements. Shapes must match.
    pub fn copy_from(&mut self, src: &Tensor) -> LaminaResult<()> {
        self.check_same_shape(src)?;
        self.data.copy_from_slice(&src.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_are_row_major() {
        let t = Tensor::zeros(&[2, 3, 4]).unwrap();
        assert_eq!(t.strides(), &[12, 4, 1]);
        assert_eq!(Tensor::scalar(1.0).strides(), &[] as &[usize]);
    }

    #[test]
    fn elementwise_ops_check_shape() {
        let a = Tensor::full(&[2, 2], 2.0).unwrap();
        let b = Tensor::full(&[2, 2], 3.0).unwrap();
        assert_eq!(a.mul(&b).unwrap().data(), &[6.0; 4]);
        assert_eq!(a.sub(&b).unwrap().neg().data(), &[1.0; 4]);
        assert!(matches!(
            a.add(&Tensor::zeros(&[4]).unwrap()),
            Err(LaminaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn copy_from_overwrites_in_place() {
        let mut dst = Tensor::zeros(&[3]).unwrap();
        let src = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);
        assert_eq!(src.sum().data(), &[6.0]);
    }

    #[test]
    fn contiguity_of_layouts() {
        assert!(Tensor::zeros(&[2, 3]).unwrap().is_contiguous());
        assert!(Tensor::scalar(1.0).is_contiguous());
        assert!(is_contiguous_layout(&[2, 1, 3], &[3, 99, 1]));
        assert!(!is_contiguous_layout(&[3, 2], &[1, 3]));
        assert!(is_contiguous_layout(&[0, 4], &[7, 7]));
    }

    #[test]
    fn oversized_shapes_are_rejected() {
        let huge = [1usize << 32, 1usize << 32];
        assert_eq!(Tensor::full(&huge, 0.0), Err(LaminaError::ShapeOverflow(huge.to_vec())));
        assert_eq!(checked_numel(&huge), Err(LaminaError::ShapeOverflow(huge.to_vec())));
        // No elements, but dropping the zero dim would overflow.
        let empty = [usize::MAX, 0, 2];
        assert_eq!(checked_numel(&empty), Err(LaminaError::ShapeOverflow(empty.to_vec())));
        assert!(matches!(Tensor::zeros(&empty), Err(LaminaError::ShapeOverflow(_))));
        assert_eq!(checked_numel(&[3, 0, 5]), Ok(0));
        assert_eq!(Tensor::zeros(&[3, 0, 5]).unwrap().numel(), 0);
        assert!(matches!(
            Tensor::from_vec(vec![], &[usize::MAX, usize::MAX]),
            Err(LaminaError::ShapeOverflow(_))
        ));
    }

    #[test]
    fn device_selects_keys() {
        let t = Tensor::zeros(&[1]).unwrap().to_device(Device::Cuda);
        assert!(t.key_set().has(DispatchKey::Cuda));
        assert!(t.key_set().has(DispatchKey::AutogradCuda));
        assert!(!t.key_set().has(DispatchKey::Cpu));
    }
}
