//! Lamina Configuration
//!
//! Runtime limits and key-propagation switches.
//! Configuration specifies constraints only; enforcement is handled by the
//! dispatcher and the layer stack.

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct LaminaConfig {
    /// Maximum depth of a dispatch operand stack
    pub max_operand_stack: usize,

    /// Maximum number of simultaneously active levels
    pub max_levels: usize,

    /// Nesting depth past which diagnostics stop recursing
    pub max_render_depth: usize,

    /// Add the differentiation keys to every new wrapper
    pub force_autograd_keys: bool,
}

impl Default for LaminaConfig {
    fn default() -> Self {
        LaminaConfig {
            max_operand_stack: 64,
            max_levels: 64,
            max_render_depth: crate::diagnostics::DEFAULT_RENDER_DEPTH,
            force_autograd_keys: true,
        }
    }
}

impl LaminaConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }
}
