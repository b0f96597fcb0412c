// Registry module
//
// This module contains everything around the virtual server records themselves:
// - types: the entity, its enums and the create/patch payloads
// - validator: field validation collecting every violation per request
// - store: the in-memory map plus JSON snapshot persistence

pub mod store;
pub mod types;
pub(crate) mod validator;

// Re-export main types for convenience
pub use store::Registry;
pub use types::{BalanceAlgorithm, ListenerMode, Timeouts, VirtualServer, VirtualServerPatch, VirtualServerSpec, VsStatus};
