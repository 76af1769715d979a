//! Per-message working state.

use crate::author::MessageAuthor;
use crate::message::ColoredString;
use regex::Regex;
use std::sync::Arc;

bitflags::bitflags! {
    /// Outcome flags set by actions while a chain runs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContextFlags: u8 {
        /// The host should drop the message.
        const CANCELLED = 1 << 0;
        /// The evaluation should be written to the filter log.
        const LOGGING   = 1 << 1;
        /// No further rules run in this chain.
        const HALTED    = 1 << 2;
    }
}

/// The unit of work for one message.
///
/// Created by the caller, threaded by `&mut` through every action of one
/// chain evaluation, then turned into a [`FilterOutcome`](crate::FilterOutcome).
/// A context is never shared between messages or threads.
#[derive(Debug)]
pub struct FilterContext {
    author: Arc<dyn MessageAuthor>,
    original: ColoredString,
    modified: ColoredString,
    flags: ContextFlags,
    chain: Option<String>,
    /// Pattern of the rule whose actions are currently running.
    pattern: Option<Arc<Regex>>,
    matched_lines: Vec<usize>,
    log_messages: Vec<String>,
}

impl FilterContext {
    pub fn new(raw: &str, author: Arc<dyn MessageAuthor>) -> Self {
        let original = ColoredString::new(raw);
        FilterContext {
            author,
            modified: original.clone(),
            original,
            flags: ContextFlags::empty(),
            chain: None,
            pattern: None,
            matched_lines: Vec::new(),
            log_messages: Vec::new(),
        }
    }

    pub fn author(&self) -> &Arc<dyn MessageAuthor> {
        &self.author
    }

    /// The message as it arrived. Never changes.
    pub fn original(&self) -> &ColoredString {
        &self.original
    }

    /// The message as edited so far.
    pub fn modified(&self) -> &ColoredString {
        &self.modified
    }

    pub fn modified_mut(&mut self) -> &mut ColoredString {
        &mut self.modified
    }

    pub fn set_modified(&mut self, message: ColoredString) {
        self.modified = message;
    }

    pub fn message_changed(&self) -> bool {
        self.modified != self.original
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn cancel(&mut self) {
        self.flags |= ContextFlags::CANCELLED;
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.contains(ContextFlags::CANCELLED)
    }

    pub fn set_logging(&mut self) {
        self.flags |= ContextFlags::LOGGING;
    }

    pub fn is_logging(&self) -> bool {
        self.flags.contains(ContextFlags::LOGGING)
    }

    /// Stop the chain after the current rule's actions.
    pub fn halt(&mut self) {
        self.flags |= ContextFlags::HALTED;
    }

    pub fn is_halted(&self) -> bool {
        self.flags.contains(ContextFlags::HALTED)
    }

    /// Name of the chain currently (or last) evaluating this context.
    pub fn chain_name(&self) -> Option<&str> {
        self.chain.as_deref()
    }

    /// Pattern of the matched rule whose actions are running. The handle is
    /// shared with the compiled rule.
    pub fn pattern(&self) -> Option<Arc<Regex>> {
        self.pattern.clone()
    }

    /// Source lines of every rule that matched, in evaluation order.
    pub fn matched_lines(&self) -> &[usize] {
        &self.matched_lines
    }

    pub fn add_log_message(&mut self, message: impl Into<String>) {
        self.log_messages.push(message.into());
    }

    pub fn log_messages(&self) -> &[String] {
        &self.log_messages
    }

    pub(crate) fn enter_chain(&mut self, name: &str) {
        self.chain = Some(name.to_string());
    }

    pub(crate) fn enter_rule(&mut self, line: usize, pattern: &Arc<Regex>) {
        self.matched_lines.push(line);
        self.pattern = Some(Arc::clone(pattern));
    }

    pub(crate) fn leave_rule(&mut self) {
        self.pattern = None;
    }
}
