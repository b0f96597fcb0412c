// Virtual server control plane
//
// This crate holds everything except the HTTP transport:
// - registry: validated, file-backed store of virtual server definitions
// - lifecycle: the status state machine and its balancer side effects
// - render: deterministic configuration artifacts for the balancer
// - control: the command channel to the balancer process
// - error: the typed failures every layer speaks
//
// The `web` crate binds all of this to a REST interface.

pub mod control;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod render;
pub mod utils;

// Re-export the main types for convenience
pub use error::{Error, Result, Violation};
pub use lifecycle::LifecycleController;
pub use registry::Registry;
