//! Lamina - Core Library
//!
//! Layered value interception: transform layers wrap values in level-tagged
//! proxies, and a dispatch table decides per call whether a proxy is handled
//! by its transform or, once its level is gone, decays to its inner value.

pub mod error;
pub mod config;
pub mod level;
pub mod liveness;
pub mod keys;
pub mod tensor;
pub mod value;
pub mod dispatch;
pub mod diagnostics;

// Re-export commonly used types
pub use error::{LaminaError, LaminaResult};
pub use config::LaminaConfig;
pub use level::Level;
pub use liveness::{LifeOwner, LivenessHandle};
pub use keys::{DispatchKey, KeySet};
pub use tensor::{Device, Tensor};
pub use value::{BatchedValue, Liveness, Value, WrappedValue};
pub use dispatch::{DispatchEvent, DispatchTable, Dispatcher, LocalKeys, Operator};
pub use diagnostics::{dump_value, dump_value_bounded, dump_value_stdout, dump_value_string};
