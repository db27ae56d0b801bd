//! Operator Definitions
//!
//! Closed set of operators the dispatcher routes.
//! Operator values are a stable contract.

use crate::error::LaminaError;

/// Operators (v0.1)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Elementwise
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Neg = 0x25,

    // Reductions
    Sum = 0x28,

    // Copies
    Clone       = 0x30,
    CopyInPlace = 0x31,
}

impl Operator {
    /// Convert raw byte to operator
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x20 => Some(Operator::Add),
            0x21 => Some(Operator::Sub),
            0x22 => Some(Operator::Mul),
            0x25 => Some(Operator::Neg),
            0x28 => Some(Operator::Sum),
            0x30 => Some(Operator::Clone),
            0x31 => Some(Operator::CopyInPlace),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(Operator::Add),
            "sub" => Some(Operator::Sub),
            "mul" => Some(Operator::Mul),
            "neg" => Some(Operator::Neg),
            "sum" => Some(Operator::Sum),
            "clone" => Some(Operator::Clone),
            "copy_" => Some(Operator::CopyInPlace),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Neg => "neg",
            Operator::Sum => "sum",
            Operator::Clone => "clone",
            Operator::CopyInPlace => "copy_",
        }
    }

    /// Number of arguments taken off the operand stack
    pub fn arity(self) -> usize {
        match self {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::CopyInPlace => 2,
            Operator::Neg | Operator::Sum | Operator::Clone => 1,
        }
    }

    /// Whether the operator writes into its first argument
    pub fn is_mutating(self) -> bool {
        matches!(self, Operator::CopyInPlace)
    }
}

impl TryFrom<u8> for Operator {
    type Error = LaminaError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Operator::from_u8(byte).ok_or(LaminaError::InvalidOperator(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_bytes_agree() {
        for op in [
            Operator::Add,
            Operator::Sub,
            Operator::Mul,
            Operator::Neg,
            Operator::Sum,
            Operator::Clone,
            Operator::CopyInPlace,
        ] {
            assert_eq!(Operator::from_u8(op as u8), Some(op));
            assert_eq!(Operator::from_name(op.name()), Some(op));
        }
        assert_eq!(Operator::from_u8(0xFF), None);
        assert_eq!(Operator::try_from(0x31), Ok(Operator::CopyInPlace));
        assert_eq!(Operator::try_from(0xFF), Err(LaminaError::InvalidOperator(0xFF)));
    }

    #[test]
    fn only_copy_mutates() {
        assert!(Operator::CopyInPlace.is_mutating());
        assert!(!Operator::Add.is_mutating());
        assert_eq!(Operator::CopyInPlace.arity(), 2);
    }
}
