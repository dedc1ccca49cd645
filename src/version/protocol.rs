//! Line protocol between the subprocess worker and its parent
//!
//! The worker writes exactly one newline-terminated line:
//!
//! ```text
//! 1,1.23     loaded, version "1.23"
//! 1,         loaded, no version
//! 0,         could not be loaded
//! ```
//!
//! The parent splits on the first comma, so the value itself may contain commas.

use crate::version::error::ProtocolError;
use crate::version::outcome::VersionOutcome;

/// Serialize an outcome as a protocol line, including the trailing newline
pub fn encode(outcome: &VersionOutcome) -> String {
    let flag = if outcome.ok { '1' } else { '0' };
    let value = outcome
        .value
        .as_deref()
        .unwrap_or_default()
        .replace(['\r', '\n'], " ");
    format!("{flag},{value}\n")
}

/// Parse the line read from a worker
pub fn decode(line: &str) -> Result<VersionOutcome, ProtocolError> {
    if line.is_empty() {
        return Err(ProtocolError::NoOutput);
    }
    let Some(body) = line.strip_suffix('\n') else {
        return Err(ProtocolError::Unterminated(line.to_string()));
    };
    let body = body.strip_suffix('\r').unwrap_or(body);

    let (flag, value) = body
        .split_once(',')
        .ok_or_else(|| ProtocolError::Malformed(body.to_string()))?;
    let ok = match flag {
        "1" => true,
        "0" => false,
        _ => return Err(ProtocolError::Malformed(body.to_string())),
    };

    Ok(VersionOutcome {
        ok,
        value: (!value.is_empty()).then(|| value.to_string()),
    })
}
