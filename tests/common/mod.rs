#![allow(dead_code)]

use rcopy::exec::RunRequest;

pub use rcopy_test_utils::{init_tracing, wait_until, with_timeout};

/// Request running `script` through `sh -c`.
pub fn sh(script: &str) -> RunRequest {
    RunRequest::new("sh", ["-c", script])
}
