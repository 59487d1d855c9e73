// src/report/mod.rs

//! Reporting collaborator.
//!
//! Buffers what the child prints and forwards it, together with the final
//! exit string, to a message queue. Messages are
//! `task_id \t b64(stdout) \t b64(stderr) \t b64(exit)`; each field is
//! encoded on its own so tabs and newlines in the payload survive.
//!
//! - [`queue`] defines the transport trait and a spool-file transport.

pub mod queue;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, error};

pub use queue::{MessageQueue, SpoolQueue};

/// Largest message the queue accepts; larger ones are dropped.
pub const MAX_MSG_SIZE: usize = 250 * 1024;

/// Buffered stdout+stderr above this size triggers a send.
pub const SHOULD_SEND_MSG_SIZE: usize = 1024;

/// Spool file for reports, enables reporting in `exec` mode.
pub const REPORT_SPOOL_ENV: &str = "FLOWGUARD_REPORT_SPOOL";
/// Task id placed in the first field of every message.
pub const TASK_ID_ENV: &str = "FLOWGUARD_TASK_ID";

pub type SharedReporter = Arc<Mutex<Reporter>>;

pub struct Reporter {
    task_id: String,
    queue: Box<dyn MessageQueue>,
    buff_out: Vec<u8>,
    buff_err: Vec<u8>,
    exit: String,
    dropped: usize,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("task_id", &self.task_id)
            .field("buffered_out", &self.buff_out.len())
            .field("buffered_err", &self.buff_err.len())
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(task_id: impl Into<String>, queue: Box<dyn MessageQueue>) -> Self {
        Self {
            task_id: task_id.into(),
            queue,
            buff_out: Vec::new(),
            buff_err: Vec::new(),
            exit: String::new(),
            dropped: 0,
        }
    }

    pub fn shared(self) -> SharedReporter {
        Arc::new(Mutex::new(self))
    }

    pub fn append_stdout(&mut self, bytes: &[u8]) {
        self.buff_out.extend_from_slice(bytes);
        if self.should_send() {
            self.flush();
        }
    }

    pub fn append_stderr(&mut self, bytes: &[u8]) {
        self.buff_err.extend_from_slice(bytes);
        if self.should_send() {
            self.flush();
        }
    }

    /// Record the exit string and send everything still buffered.
    pub fn send_exit(&mut self, exit: &str) {
        self.exit = exit.to_string();
        self.flush();
    }

    /// Send the current buffers as one message and reset them.
    ///
    /// Oversized messages are dropped, never truncated. Transport errors
    /// are logged; the caller is never failed.
    pub fn flush(&mut self) {
        let msg = encode_message(&self.task_id, &self.buff_out, &self.buff_err, &self.exit);
        self.buff_out.clear();
        self.buff_err.clear();
        self.exit.clear();

        if msg.len() > MAX_MSG_SIZE {
            self.dropped += 1;
            error!(
                len = msg.len(),
                max = MAX_MSG_SIZE,
                "message too long; dropping message"
            );
            return;
        }

        debug!(len = msg.len(), "sending report message");
        if let Err(e) = self.queue.send(&msg) {
            error!(error = %e, "sending report message failed");
        }
    }

    /// Number of messages dropped for exceeding [`MAX_MSG_SIZE`].
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn should_send(&self) -> bool {
        self.buff_out.len() + self.buff_err.len() > SHOULD_SEND_MSG_SIZE
    }
}

/// Build one wire message. Empty fields encode as empty strings.
pub fn encode_message(task_id: &str, out: &[u8], err: &[u8], exit: &str) -> String {
    [
        task_id.to_string(),
        encode(out),
        encode(err),
        encode(exit.as_bytes()),
    ]
    .join("\t")
}

fn encode(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        String::new()
    } else {
        STANDARD.encode(bytes)
    }
}

/// Reporter configured from `FLOWGUARD_REPORT_SPOOL` / `FLOWGUARD_TASK_ID`,
/// if the spool variable is set.
pub fn reporter_from_env() -> Option<SharedReporter> {
    let spool = std::env::var(REPORT_SPOOL_ENV).ok().filter(|s| !s.is_empty())?;
    let task_id = std::env::var(TASK_ID_ENV).unwrap_or_default();
    debug!(spool = %spool, task_id = %task_id, "reporting enabled");
    let queue = SpoolQueue::new(PathBuf::from(spool));
    Some(Reporter::new(task_id, Box::new(queue)).shared())
}
