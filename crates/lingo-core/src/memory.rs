//! In-process conversation memory.
//!
//! Keeps a rolling window of recent turns for context passing and escalation. The
//! log is advisory: concurrent requests may interleave their turns.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::sync::IgnoreLock as _;
use crate::{ConversationMemory, HistoryMessage, Role, Turn};

/// Default number of turns retained.
pub const DEFAULT_MAX_TURNS: usize = 200;

/// Bounded ring buffer of conversation turns.
pub struct InMemoryConversation {
    turns: Mutex<VecDeque<Turn>>,
    max_turns: usize,
    enabled: AtomicBool,
}

impl InMemoryConversation {
    /// Creates an enabled memory retaining at most `max_turns` turns.
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: Mutex::new(VecDeque::with_capacity(max_turns.min(DEFAULT_MAX_TURNS))),
            max_turns,
            enabled: AtomicBool::new(true),
        }
    }

    /// Resume recording turns.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Stop recording turns; existing turns are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Whether new turns are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Forget every recorded turn.
    pub fn clear(&self) {
        self.turns.lock_ignore_poison().clear();
    }

    /// The `count` most recent turns with timestamps, oldest first.
    #[must_use]
    pub fn peek(&self, count: usize) -> Vec<Turn> {
        let turns = self.turns.lock_ignore_poison();
        let skip = turns.len().saturating_sub(count.max(1));
        turns.iter().skip(skip).cloned().collect()
    }

    /// Number of retained turns.
    pub fn len(&self) -> usize {
        self.turns.lock_ignore_poison().len()
    }

    /// Whether no turn is retained.
    pub fn is_empty(&self) -> bool {
        self.turns.lock_ignore_poison().is_empty()
    }
}

impl Default for InMemoryConversation {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationMemory for InMemoryConversation {
    fn add_turn(&self, role: Role, content: &str) {
        if !self.is_enabled() {
            return;
        }
        let mut turns = self.turns.lock_ignore_poison();
        while turns.len() >= self.max_turns {
            turns.pop_front();
        }
        turns.push_back(Turn::new(role, content));
    }

    fn recent_history(&self, count: usize) -> Vec<HistoryMessage> {
        self.peek(count).iter().map(Turn::to_message).collect()
    }
}
