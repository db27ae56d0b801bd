//! Layer stack for Lamina
//!
//! Owns the liveness flag of every active level. Pushing a level hands out a
//! fresh flag; popping it flips that flag once, which is how every wrapper
//! created at the level learns it is dead. Transform semantics live elsewhere.

pub use lamina_core::{LaminaError, LaminaResult, Level, LivenessHandle, Value, WrappedValue};

pub mod audit;

use log::debug;

use lamina_core::{LaminaConfig, LifeOwner};

pub use audit::{AuditLog, Transition};

/// Kind of transform a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Grad,
    Jvp,
    Vmap,
}

impl TransformKind {
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::Grad => "grad",
            TransformKind::Jvp => "jvp",
            TransformKind::Vmap => "vmap",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "grad" => Some(TransformKind::Grad),
            "jvp" => Some(TransformKind::Jvp),
            "vmap" => Some(TransformKind::Vmap),
            _ => None,
        }
    }
}

/// An active level and the owner of its liveness flag.
#[derive(Debug)]
pub struct Layer {
    level: Level,
    kind: TransformKind,
    life: LifeOwner,
}

impl Layer {
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn is_alive(&self) -> bool {
        self.life.is_alive()
    }
}

#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    max_levels: usize,
    force_autograd_keys: bool,
    audit: AuditLog,
}

impl LayerStack {
    pub fn new(config: &LaminaConfig) -> Self {
        LayerStack {
            layers: Vec::new(),
            max_levels: config.max_levels,
            force_autograd_keys: config.force_autograd_keys,
            audit: AuditLog::new(),
        }
    }

    /// Push a new innermost level. Levels are numbered from 1.
    pub fn push(&mut self, kind: TransformKind) -> LaminaResult<Level> {
        if self.layers.len() >= self.max_levels {
            return Err(LaminaError::LevelLimit(self.max_levels));
        }
        let level = self.current_level().map_or(Level(1), Level::next);
        self.layers.push(Layer { level, kind, life: LifeOwner::new() });
        self.audit.record(Transition::Pushed { level, kind });
        debug!("pushed {} level {}", kind.name(), level);
        Ok(level)
    }

    /// Pop the innermost level and mark it dead.
    pub fn pop(&mut self) -> LaminaResult<Layer> {
        let layer = self.layers.pop().ok_or(LaminaError::NoActiveLevel)?;
        layer.life.kill();
        self.audit.record(Transition::Popped { level: layer.level, kind: layer.kind });
        debug!("popped {} level {}", layer.kind.name(), layer.level);
        Ok(layer)
    }

    pub fn current_level(&self) -> Option<Level> {
        self.layers.last().map(Layer::level)
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, level: Level) -> Option<&Layer> {
        self.layers.iter().find(|l| l.level == level)
    }

    /// Liveness handle new wrappers at `level` must share.
    pub fn life_handle_for_level(&self, level: Level) -> LaminaResult<LivenessHandle> {
        self.layer(level)
            .map(|l| l.life.handle())
            .ok_or(LaminaError::LevelNotActive(level))
    }

    /// Wrap `value` for an active `level`, attached to that level's flag.
    pub fn wrap(&self, value: Value, level: Level) -> LaminaResult<WrappedValue> {
        let handle = self.life_handle_for_level(level)?;
        WrappedValue::with_key_policy(value, level, handle, self.force_autograd_keys)
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}
