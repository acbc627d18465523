//! `medstock-audit` — fire-and-forget audit channel.
//!
//! Every handled request produces an [`AuditRecord`]; the HTTP surface
//! pushes it here after dispatch returns. The sink is deliberately
//! lightweight:
//!
//! - **Never blocks** the request path: publishing is a short lock plus a
//!   wakeup, no IO.
//! - **Never fails** a request: a full buffer drops the oldest record and
//!   keeps going.
//! - **Best-effort delivery**: a background worker drains the buffer and
//!   emits each record as a structured `tracing` event on the `audit`
//!   target, where the log pipeline picks it up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One handled HTTP request, as seen from the outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub method: String,
    pub path: String,
    pub operator_email: Option<String>,
    pub remote_addr: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub status: u16,
}

struct Inner {
    buffer: Mutex<VecDeque<AuditRecord>>,
    notify: Notify,
    capacity: usize,
}

/// Bounded, clonable handle to the audit buffer.
#[derive(Clone)]
pub struct AuditSink {
    inner: Arc<Inner>,
}

impl AuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer: Mutex::new(VecDeque::with_capacity(capacity)),
                notify: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Enqueue a record. On overflow the oldest record is dropped so the
    /// buffer keeps the most recent activity.
    pub fn publish(&self, record: AuditRecord) {
        {
            let mut buffer = match self.inner.buffer.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::warn!("audit buffer poisoned; dropping record");
                    return;
                }
            };
            if buffer.len() >= self.inner.capacity {
                buffer.pop_front();
                tracing::warn!("audit buffer full; dropped oldest record");
            }
            buffer.push_back(record);
        }
        self.inner.notify.notify_one();
    }

    /// Number of records currently buffered.
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<AuditRecord> {
        match self.inner.buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Spawn the background worker that drains the buffer and logs each
    /// record. Runs until the process exits; losing records on shutdown is
    /// acceptable for an observability channel.
    pub fn spawn_worker(&self) -> tokio::task::JoinHandle<()> {
        let sink = self.clone();
        tokio::spawn(async move {
            loop {
                let batch = sink.drain();
                if batch.is_empty() {
                    sink.inner.notify.notified().await;
                    continue;
                }
                for record in batch {
                    tracing::info!(
                        target: "audit",
                        method = %record.method,
                        path = %record.path,
                        operator = record.operator_email.as_deref().unwrap_or("-"),
                        remote_addr = record.remote_addr.as_deref().unwrap_or("-"),
                        status = record.status,
                        elapsed_ms = record.elapsed_ms,
                        started_at = %record.started_at,
                        "handled request"
                    );
                }
            }
        })
    }
}

impl Default for AuditSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> AuditRecord {
        AuditRecord {
            method: "GET".to_string(),
            path: path.to_string(),
            operator_email: None,
            remote_addr: None,
            started_at: Utc::now(),
            elapsed_ms: 1,
            status: 200,
        }
    }

    #[test]
    fn publish_without_worker_never_blocks() {
        let sink = AuditSink::new(2);
        for i in 0..100 {
            sink.publish(record(&format!("/m/{i}")));
        }
        // If publish blocked on a full buffer this test would hang.
        assert_eq!(sink.drain().len(), 2);
    }

    #[test]
    fn overflow_drops_oldest() {
        let sink = AuditSink::new(3);
        for path in ["/a", "/b", "/c", "/d"] {
            sink.publish(record(path));
        }
        let paths: Vec<String> = sink.drain().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/b", "/c", "/d"]);
    }

    #[tokio::test]
    async fn worker_drains_the_buffer() {
        let sink = AuditSink::new(8);
        let _worker = sink.spawn_worker();
        sink.publish(record("/medicines"));

        for _ in 0..100 {
            if sink.is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("worker did not drain the buffer");
    }
}
