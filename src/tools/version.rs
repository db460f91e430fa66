//! `get_server_version` tool (§4.1).

use crate::error::Result;
use rmcp::model::ProtocolVersion;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Accepts any shape; unrecognized keys are ignored rather than
/// rejected, since this tool exists purely as a capability probe.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VersionInput {}

#[derive(Debug, Serialize)]
pub struct VersionOutput {
    pub version: String,
    pub protocol_version: ProtocolVersion,
}

/// Executes `get_server_version`.
pub fn execute_version(_input: VersionInput) -> Result<VersionOutput> {
    Ok(VersionOutput { version: env!("CARGO_PKG_VERSION").to_string(), protocol_version: ProtocolVersion::default() })
}
