use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use agentdev::collab::{FileRecord, GenerateFuture, Generator};
use agentdev::dag::Task;
use agentdev::errors::AgentDevError;

/// One scripted answer for a task.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Files(Vec<FileRecord>),
    Fail(String),
}

/// A fake generator that:
/// - records which tasks were asked for files, in order
/// - answers from a per-task script (consumed front to back, the last answer
///   repeating), or with no files when nothing is scripted.
#[derive(Debug, Clone, Default)]
pub struct FakeGenerator {
    script: HashMap<String, VecDeque<FakeResponse>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `task` with these files.
    pub fn files(mut self, task: &str, files: Vec<FileRecord>) -> Self {
        self.push(task, FakeResponse::Files(files));
        self
    }

    /// Make the next attempt of `task` fail with `message`.
    pub fn fail(mut self, task: &str, message: &str) -> Self {
        self.push(task, FakeResponse::Fail(message.to_string()));
        self
    }

    /// Shared handle to the recorded call order.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn push(&mut self, task: &str, response: FakeResponse) {
        self.script
            .entry(task.to_string())
            .or_default()
            .push_back(response);
    }

    fn answer(&mut self, task: &str) -> FakeResponse {
        match self.script.get_mut(task) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or(FakeResponse::Files(vec![])),
            None => FakeResponse::Files(vec![]),
        }
    }
}

impl Generator for FakeGenerator {
    fn generate<'a>(&'a mut self, task: &'a Task) -> GenerateFuture<'a> {
        self.calls.lock().unwrap().push(task.id().to_string());
        let response = self.answer(task.id());

        Box::pin(async move {
            match response {
                FakeResponse::Files(files) => Ok(files),
                FakeResponse::Fail(message) => {
                    Err(AgentDevError::Other(anyhow::anyhow!(message)))
                }
            }
        })
    }
}
