// ABOUTME: Runtime type definitions for Docker and Podman.
// ABOUTME: Includes RuntimeType, the detected endpoint and explicit overrides.

use serde::{Deserialize, Serialize};

/// The container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Name of the runtime's command-line client.
    pub fn cli_binary(self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cli_binary())
    }
}

/// Where the runtime API socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEndpoint {
    pub runtime_type: RuntimeType,
    pub socket_path: String,
}

/// Explicit runtime selection, overriding auto-detection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    pub runtime: Option<RuntimeType>,
    pub socket: Option<String>,
}
