// ABOUTME: Info command implementation.
// ABOUTME: Reports the detected runtime endpoint and what the runtime says about itself.

use hangar::config::Config;
use hangar::error::Result;
use hangar::output::Output;
use hangar::runtime::{BollardRuntime, RuntimeError, RuntimeInfoOps, detect_local};

pub async fn info(config: &Config, output: &Output) -> Result<()> {
    let endpoint = detect_local(Some(&config.runtime_config())).map_err(RuntimeError::from)?;
    let runtime = BollardRuntime::connect(&endpoint).map_err(RuntimeError::from)?;
    let metadata = runtime.info().await.map_err(RuntimeError::from)?;

    output.print_fields(&[
        ("runtime", endpoint.runtime_type.to_string()),
        ("socket", endpoint.socket_path),
        ("version", metadata.version),
        ("api", metadata.api_version),
        ("platform", format!("{}/{}", metadata.os, metadata.arch)),
        ("workspace", config.workspace.display().to_string()),
    ]);
    Ok(())
}
