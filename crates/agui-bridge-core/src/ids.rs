//! Thread, run, and message identifiers.
//!
//! Every id carries a UUID v4 suffix, so collisions across processes are
//! negligible and nothing has to be coordinated between concurrent runs.

use uuid::Uuid;

/// New thread id of the form `{prefix}_{uuid}`.
pub fn new_thread_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4())
}

/// New run id of the form `run_{uuid}`.
pub fn new_run_id() -> String {
    format!("run_{}", Uuid::new_v4())
}

/// New message id of the form `msg_{uuid}`.
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::new_v4())
}
