use super::BalancerControl;
use crate::registry::types::VirtualServer;
use crate::render::RenderedConfig;
use async_trait::async_trait;
use interprocess::local_socket::prelude::LocalSocketStream;
use interprocess::local_socket::traits::Stream as _;
use interprocess::local_socket::{GenericFilePath, GenericNamespaced, Name, ToFsName, ToNsName};
use log::trace;

/// Balancer control channel over a local socket / named pipe.
///
/// One request per connection: a command line, for `apply` followed by the
/// rendered configuration and a terminating blank line. The balancer answers
/// a single line, `ok` or `err <reason>`.
#[derive(Debug, Clone)]
pub struct SocketControl {
    socket_path: String,
}

impl SocketControl {
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    async fn send_command(&self, request: String) -> Result<(), String> {
        let socket_path = self.socket_path.clone();
        tokio::task::spawn_blocking(move || {
            use std::io::{BufRead, BufReader, Write};

            let name = resolve_name(&socket_path)?;
            let mut stream = LocalSocketStream::connect(name).map_err(|e| format!("Failed to connect to balancer socket: {}", e))?;
            stream.write_all(request.as_bytes()).map_err(|e| format!("Failed to send command: {}", e))?;
            stream.flush().map_err(|e| format!("Failed to flush command: {}", e))?;

            let mut reader = BufReader::new(stream);
            let mut response = String::new();
            reader.read_line(&mut response).map_err(|e| format!("Failed to read balancer response: {}", e))?;

            let response = response.trim();
            trace!("Balancer response: {}", response);
            if response == "ok" {
                Ok(())
            } else if let Some(reason) = response.strip_prefix("err ") {
                Err(reason.to_string())
            } else {
                Err(format!("Unexpected balancer response: '{}'", response))
            }
        })
        .await
        .map_err(|e| format!("Balancer control task failed: {}", e))?
    }
}

#[async_trait]
impl BalancerControl for SocketControl {
    async fn apply(&self, server: &VirtualServer, rendered: &RenderedConfig) -> Result<(), String> {
        self.send_command(apply_request(server, rendered)).await
    }

    async fn drain(&self, server: &VirtualServer) -> Result<(), String> {
        self.send_command(format!("drain {}\n", server.id)).await
    }

    async fn withdraw(&self, server: &VirtualServer) -> Result<(), String> {
        self.send_command(format!("withdraw {}\n", server.id)).await
    }
}

fn apply_request(server: &VirtualServer, rendered: &RenderedConfig) -> String {
    // Rendered contents already end with a newline; the extra one terminates the payload.
    format!("apply {}\n{}\n", server.id, rendered.contents)
}

// Paths with separators are filesystem sockets; bare names use the platform
// namespace (Linux abstract namespace, Windows named pipes).
fn resolve_name(path: &str) -> Result<Name<'_>, String> {
    if path.contains('/') || path.contains('\\') {
        path.to_fs_name::<GenericFilePath>().map_err(|e| format!("Invalid balancer socket path '{}': {}", path, e))
    } else {
        path.to_ns_name::<GenericNamespaced>().map_err(|e| format!("Invalid balancer socket name '{}': {}", path, e))
    }
}
