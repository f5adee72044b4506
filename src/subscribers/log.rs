//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [spawned] pid=4711 workers=3 program="/usr/libexec/worker"
//! [spawn-failed] err="No such file or directory (os error 2)"
//! [reaped] pid=4711 workers=2
//! [poll] decision=spawn workers=0
//! [shutdown-requested]
//! [process-group-signaled]
//! [signal-failed] err="EPERM: Operation not permitted"
//! [idle-shutdown]
//! ```
//!
//! Note that in a deployed supervisor the standard streams are usually
//! re-pointed at `/dev/null` by the descriptor bootstrap; wire a custom
//! [`Subscriber`] at syslog or a file for production logging.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscriber;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Intended for development and the
/// bundled CLI; implement a custom [`Subscriber`] for structured logging.
pub struct LogWriter;

/// Formats one event as a log line.
///
/// Metadata a kind normally carries but that happens to be absent renders
/// as `0` (pid, workers) or `"?"` (reason).
fn render(e: &Event) -> String {
    let pid = e.pid.unwrap_or(0);
    let workers = e.workers.unwrap_or(0);
    let reason = e.reason.as_deref().unwrap_or("?");
    match e.kind {
        EventKind::WorkerSpawned => {
            format!("[spawned] pid={pid} workers={workers} program={reason:?}")
        }
        EventKind::SpawnFailed => format!("[spawn-failed] err={reason:?}"),
        EventKind::WorkerReaped => format!("[reaped] pid={pid} workers={workers}"),
        EventKind::ReapFailed => format!("[reap-failed] err={reason:?}"),
        EventKind::PollDecision => format!("[poll] decision={reason} workers={workers}"),
        EventKind::ShutdownRequested => "[shutdown-requested]".to_string(),
        EventKind::ProcessGroupSignaled => "[process-group-signaled]".to_string(),
        EventKind::SignalFailed => format!("[signal-failed] err={reason:?}"),
        EventKind::IdleShutdown => "[idle-shutdown]".to_string(),
    }
}

#[async_trait]
impl Subscriber for LogWriter {
    async fn handle(&self, e: &Event) {
        println!("{}", render(e));
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
