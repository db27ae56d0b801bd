pub mod dispatcher;
pub mod fallback;
pub mod kernels;
pub mod operator;
pub mod stack;
pub mod table;

pub use dispatcher::{CallContext, DispatchEvent, Dispatcher, DropReason, LocalKeys};
pub use operator::Operator;
pub use stack::OperandStack;
pub use table::{DispatchTable, Kernel};
