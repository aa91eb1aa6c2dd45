// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory services for exercising pollers and the waiter without a server.
//!
//! Scripts are per name. Each poll consumes the next scripted reply; the last
//! successful reply repeats once the script runs out, so an operation that
//! never finishes only needs a single pending entry.

use crate::client::{ExtendedOperationService, OperationsService, ResourceGetter};
use crate::error::{LroError, Result};
use crate::operation::{ExtendedOperation, Operation};
use crate::waiter::{ProgressTracker, WaitState};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

fn not_found(name: &str) -> LroError {
    LroError::Api(tonic::Status::not_found(format!("{name} not found")))
}

/// Per-name reply queues with poll counters.
#[derive(Debug)]
struct Script<T> {
    replies: HashMap<String, VecDeque<Result<T>>>,
    polls: HashMap<String, u32>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            polls: HashMap::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self, name: &str) -> Result<T> {
        *self.polls.entry(name.to_string()).or_default() += 1;

        let Some(queue) = self.replies.get_mut(name) else {
            return Err(not_found(name));
        };
        if queue.len() == 1 {
            if let Some(Ok(reply)) = queue.front() {
                return Ok(reply.clone());
            }
        }
        queue.pop_front().unwrap_or_else(|| Err(not_found(name)))
    }
}

/// A scripted `google.longrunning` operations service.
#[derive(Debug, Default)]
pub struct ScriptedOperations {
    script: Mutex<Script<Operation>>,
    cancelled: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedOperations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the replies for `name`.
    pub fn script(&self, name: &str, replies: Vec<Result<Operation>>) {
        let mut script = self.script.lock().unwrap();
        script.replies.insert(name.to_string(), replies.into());
    }

    /// Number of status checks issued for `name`.
    pub fn polls(&self, name: &str) -> u32 {
        let script = self.script.lock().unwrap();
        script.polls.get(name).copied().unwrap_or(0)
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperationsService for ScriptedOperations {
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.script.lock().unwrap().next(name)
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// A scripted service for status-based operations.
#[derive(Debug, Default)]
pub struct ScriptedExtendedOperations {
    script: Mutex<Script<ExtendedOperation>>,
}

impl ScriptedExtendedOperations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, name: &str, replies: Vec<Result<ExtendedOperation>>) {
        let mut script = self.script.lock().unwrap();
        script.replies.insert(name.to_string(), replies.into());
    }

    pub fn polls(&self, name: &str) -> u32 {
        let script = self.script.lock().unwrap();
        script.polls.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExtendedOperationService for ScriptedExtendedOperations {
    async fn get_extended_operation(&self, name: &str) -> Result<ExtendedOperation> {
        self.script.lock().unwrap().next(name)
    }
}

/// An in-memory resource store.
///
/// Missing resources answer `NOT_FOUND`. A name set with
/// [`Self::fail_with`] fails once with the given error and then behaves
/// normally again. A name given a [`Self::script`] answers from the script
/// instead of the store.
#[derive(Debug, Default)]
pub struct ScriptedResources {
    resources: Mutex<HashMap<String, Value>>,
    script: Mutex<Script<Value>>,
    failures: Mutex<HashMap<String, VecDeque<LroError>>>,
    fetches: Mutex<HashMap<String, u32>>,
}

impl ScriptedResources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, resource: Value) {
        self.resources
            .lock()
            .unwrap()
            .insert(name.to_string(), resource);
    }

    pub fn remove(&self, name: &str) {
        self.resources.lock().unwrap().remove(name);
    }

    /// Answer fetches of `name` with successive replies.
    pub fn script(&self, name: &str, replies: Vec<Result<Value>>) {
        let mut script = self.script.lock().unwrap();
        script.replies.insert(name.to_string(), replies.into());
    }

    /// Queue an error for the next fetch of `name`.
    pub fn fail_with(&self, name: &str, error: LroError) {
        self.failures
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn fetches(&self, name: &str) -> u32 {
        self.fetches.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ResourceGetter for ScriptedResources {
    type Resource = Value;

    async fn get(&self, name: &str) -> Result<Value> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;

        if let Some(error) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        {
            let mut script = self.script.lock().unwrap();
            if script.replies.contains_key(name) {
                return script.next(name);
            }
        }

        self.resources
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(name))
    }
}

/// One callback observed by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start { operation: String, message: String },
    Poll { poll: u32, detail: Option<String> },
    Sleep(Duration),
    Finish(WaitState),
}

/// A progress tracker that records every callback.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Delays slept, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Sleep(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn polls(&self) -> u32 {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Poll { .. }))
            .count() as u32
    }

    pub fn details(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Poll { detail, .. } => detail,
                _ => None,
            })
            .collect()
    }

    pub fn final_state(&self) -> Option<WaitState> {
        self.events().into_iter().rev().find_map(|e| match e {
            ProgressEvent::Finish(state) => Some(state),
            _ => None,
        })
    }
}

impl ProgressTracker for RecordingProgress {
    fn start(&self, operation: &str, message: &str) {
        self.events.lock().unwrap().push(ProgressEvent::Start {
            operation: operation.to_string(),
            message: message.to_string(),
        });
    }

    fn on_poll(&self, poll: u32, detail: Option<&str>) {
        self.events.lock().unwrap().push(ProgressEvent::Poll {
            poll,
            detail: detail.map(str::to_string),
        });
    }

    fn on_sleep(&self, delay: Duration) {
        self.events.lock().unwrap().push(ProgressEvent::Sleep(delay));
    }

    fn finish(&self, state: WaitState) {
        self.events.lock().unwrap().push(ProgressEvent::Finish(state));
    }
}
