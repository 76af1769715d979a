//! Recording fakes shared by unit tests.

use crate::author::{AuthorId, MessageAuthor, MessageSink};
use crate::error::{CapabilityError, CapabilityResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Author that records every capability call as `"<capability>:<text>"`.
#[derive(Debug, Default)]
pub(crate) struct RecordingAuthor {
    pub name: String,
    pub permissions: HashSet<String>,
    /// Capabilities that report `Unsupported`.
    pub unsupported: HashSet<&'static str>,
    /// Capabilities that report `Failed`.
    pub failing: HashSet<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingAuthor {
    pub fn new(name: &str) -> Self {
        RecordingAuthor { name: name.to_string(), ..Default::default() }
    }

    pub fn arc(name: &str) -> Arc<dyn MessageAuthor> {
        Arc::new(Self::new(name))
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn unsupported(mut self, capability: &'static str) -> Self {
        self.unsupported.insert(capability);
        self
    }

    pub fn failing(mut self, capability: &'static str) -> Self {
        self.failing.insert(capability);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, capability: &'static str, text: String) -> CapabilityResult {
        if self.unsupported.contains(capability) {
            return Err(CapabilityError::Unsupported(capability));
        }
        if self.failing.contains(capability) {
            return Err(CapabilityError::Failed(format!("{capability} refused")));
        }
        self.calls.lock().push(format!("{capability}:{text}"));
        Ok(())
    }
}

impl MessageAuthor for RecordingAuthor {
    fn id(&self) -> AuthorId {
        AuthorId::new(format!("id-{}", self.name))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) -> CapabilityResult {
        self.record("message", message.to_string())
    }

    fn kick(&self, message: &str) -> CapabilityResult {
        self.record("kick", message.to_string())
    }

    fn kill(&self, message: &str) -> CapabilityResult {
        self.record("kill", message.to_string())
    }

    fn fine(&self, amount: f64, message: &str) -> CapabilityResult {
        self.record("fine", format!("{amount}:{message}"))
    }

    fn execute_command(&self, command: &str) -> CapabilityResult {
        self.record("command", command.to_string())
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl MessageSink for RecordingSink {
    fn console(&self, message: &str) {
        self.lines.lock().push(format!("console:{message}"));
    }

    fn broadcast(&self, message: &str) {
        self.lines.lock().push(format!("broadcast:{message}"));
    }

    fn notify(&self, permission: &str, message: &str) {
        self.lines.lock().push(format!("notify:{permission}:{message}"));
    }
}
