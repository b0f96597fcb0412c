// Balancer control
//
// The process that owns the actual listeners is external; transitions talk to
// it through this seam. `SocketControl` speaks to a real balancer over a local
// socket, `NoopControl` keeps the control plane usable with none attached.

use crate::registry::types::VirtualServer;
use crate::render::RenderedConfig;
use async_trait::async_trait;
use log::debug;

pub mod socket;

pub use socket::SocketControl;

/// Commands a lifecycle transition pushes down to the running balancer.
///
/// Errors are plain strings: the transport decides what failure looks like,
/// the lifecycle controller decides what to do about it.
#[async_trait]
pub trait BalancerControl: Send + Sync {
    /// Install or refresh the listener and its backend pool.
    async fn apply(&self, server: &VirtualServer, rendered: &RenderedConfig) -> Result<(), String>;

    /// Let in-flight connections finish before the listener goes away.
    async fn drain(&self, server: &VirtualServer) -> Result<(), String>;

    /// Stop accepting new connections for this listener.
    async fn withdraw(&self, server: &VirtualServer) -> Result<(), String>;
}

/// Standalone mode: every command is accepted without a balancer attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopControl;

#[async_trait]
impl BalancerControl for NoopControl {
    async fn apply(&self, server: &VirtualServer, _rendered: &RenderedConfig) -> Result<(), String> {
        debug!("No balancer attached, accepting apply for {}", server.name);
        Ok(())
    }

    async fn drain(&self, server: &VirtualServer) -> Result<(), String> {
        debug!("No balancer attached, accepting drain for {}", server.name);
        Ok(())
    }

    async fn withdraw(&self, server: &VirtualServer) -> Result<(), String> {
        debug!("No balancer attached, accepting withdraw for {}", server.name);
        Ok(())
    }
}
