//! Shared test doubles: a scripted in-process transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use conjure_rs::op::{OpResponse, Operation};
use conjure_rs::transport::{AttemptFailure, RawByteStream, Transport};

/// A failure to inject before the transport starts succeeding.
#[derive(Debug, Clone)]
pub enum Fault {
    Connect,
    Timeout,
    Status(u16),
    StatusRetryAfter(u16, u64),
}

impl Fault {
    fn to_failure(&self) -> AttemptFailure {
        match *self {
            Fault::Connect => AttemptFailure::Connect {
                message: "connection refused".into(),
            },
            Fault::Timeout => AttemptFailure::Timeout {
                message: "deadline exceeded".into(),
            },
            Fault::Status(status) => AttemptFailure::Status {
                status,
                detail: format!("scripted {status}"),
                retry_after: None,
            },
            Fault::StatusRetryAfter(status, secs) => AttemptFailure::Status {
                status,
                detail: format!("scripted {status}"),
                retry_after: Some(Duration::from_secs(secs)),
            },
        }
    }
}

/// One scripted behavior for a `stream()` call.
#[derive(Debug, Clone)]
pub enum StreamStep {
    Fail(Fault),
    Deliver(Vec<&'static [u8]>),
    DeliverThenBreak(Vec<&'static [u8]>),
}

/// In-process transport with scripted faults and canned results.
///
/// Faults apply to regular operations only; `open_document` and
/// `close_document` always succeed unless `fail_close` is set. Every
/// dispatched operation's wire name is logged in order.
#[derive(Default)]
pub struct ScriptedTransport {
    faults: Mutex<VecDeque<Fault>>,
    stream_steps: Mutex<VecDeque<StreamStep>>,
    results: Mutex<HashMap<String, Value>>,
    log: Mutex<Vec<String>>,
    counter: AtomicU64,
    fail_close: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: impl IntoIterator<Item = Fault>) -> Self {
        let t = Self::new();
        t.faults.lock().unwrap().extend(faults);
        t
    }

    /// Canned `r` payload for an operation's replies.
    pub fn set_result(&self, op: &str, result: Value) {
        self.results.lock().unwrap().insert(op.to_string(), result);
    }

    pub fn push_stream_step(&self, step: StreamStep) {
        self.stream_steps.lock().unwrap().push_back(step);
    }

    /// Make `close_document` fail with the given status.
    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    /// Wire names of every dispatched operation, in order.
    pub fn sent(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn send_count(&self, op: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|o| *o == op).count()
    }

    fn default_result(&self, op: &Operation) -> Value {
        match op.wire_name() {
            "open_document" => json!({ "document": "doc-1" }),
            "close_document" => json!({}),
            "create_box" | "create_cylinder" | "create_sphere" | "boolean_fuse"
            | "boolean_intersect" => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                json!({ "object": format!("obj-{n}") })
            }
            // Transforms and cut mutate in place unless a result is scripted.
            "move_object" | "rotate_object" | "scale_object" | "create_fillet"
            | "create_chamfer" | "boolean_cut" => json!({}),
            "find_objects" => json!({ "o": [] }),
            "measure_distance" => json!({ "distance": 0.0 }),
            "get_bounding_box" => json!({ "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0] }),
            _ => json!({}),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, op: &Operation) -> Result<OpResponse, AttemptFailure> {
        self.log.lock().unwrap().push(op.wire_name().to_string());

        match op.wire_name() {
            "open_document" => {}
            "close_document" => {
                if self.fail_close.load(Ordering::SeqCst) {
                    return Err(AttemptFailure::Status {
                        status: 500,
                        detail: "close rejected".into(),
                        retry_after: None,
                    });
                }
            }
            _ => {
                if let Some(fault) = self.faults.lock().unwrap().pop_front() {
                    return Err(fault.to_failure());
                }
            }
        }

        let result = self
            .results
            .lock()
            .unwrap()
            .get(op.wire_name())
            .cloned()
            .unwrap_or_else(|| self.default_result(op));

        Ok(OpResponse {
            success: true,
            result,
        })
    }

    async fn stream(&self, op: &Operation) -> Result<RawByteStream, AttemptFailure> {
        self.log.lock().unwrap().push(op.wire_name().to_string());

        let step = self
            .stream_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StreamStep::Deliver(vec![b"solid scripted\n"]));

        match step {
            StreamStep::Fail(fault) => Err(fault.to_failure()),
            StreamStep::Deliver(chunks) => {
                let items: Vec<Result<Bytes, AttemptFailure>> = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c)))
                    .collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            StreamStep::DeliverThenBreak(chunks) => {
                let mut items: Vec<Result<Bytes, AttemptFailure>> = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c)))
                    .collect();
                items.push(Err(AttemptFailure::StreamBroken {
                    message: "connection reset".into(),
                }));
                Ok(Box::pin(futures::stream::iter(items)))
            }
        }
    }
}
