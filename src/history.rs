//! Bounded, circular store of previously accepted command lines.

use log::debug;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Default number of entries kept before the oldest one is evicted.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("no history entry at offset {offset} ({len} recorded)")]
    InvalidIndex { offset: usize, len: usize },
}

/// Occupied region of the ring, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    front: usize,
    rear: usize,
}

/// Fixed-capacity ring buffer of command lines.
///
/// Storage is allocated once. Appending to a full buffer evicts the oldest entry by
/// advancing `front`, then overwrites the slot after `rear` in place, reusing its
/// allocation. Entries are addressed by *display index*: 0 is always the oldest
/// live entry, regardless of where it sits in the ring.
#[derive(Debug, Clone)]
pub struct History {
    slots: Vec<String>,
    span: Option<Span>,
}

impl History {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![String::new(); capacity.get()],
            span: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        match self.span {
            None => 0,
            Some(Span { front, rear }) if rear >= front => rear - front + 1,
            Some(Span { front, rear }) => rear + self.capacity() - front + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Record `command` as the newest entry, evicting the oldest when full.
    pub fn append(&mut self, command: &str) {
        let span = match self.span {
            None => Span { front: 0, rear: 0 },
            Some(Span { front, rear }) => {
                let front = if self.is_full() {
                    debug!("history full, evicting {:?}", self.slots[front]);
                    (front + 1) % self.capacity()
                } else {
                    front
                };
                Span {
                    front,
                    rear: (rear + 1) % self.capacity(),
                }
            }
        };

        let slot = &mut self.slots[span.rear];
        slot.clear();
        slot.push_str(command);
        self.span = Some(span);
    }

    /// Entries from oldest to newest, paired with their display index.
    pub fn list(&self) -> Entries<'_> {
        Entries {
            history: self,
            next: 0,
            len: self.len(),
        }
    }

    /// Forget every entry. Storage is kept for reuse.
    pub fn clear(&mut self) {
        self.span = None;
    }

    /// Entry at display index `offset`, valid in `[0, len)`.
    pub fn recall(&self, offset: usize) -> Result<&str, HistoryError> {
        let len = self.len();
        match self.span {
            Some(Span { front, .. }) if offset < len => {
                Ok(&self.slots[(front + offset) % self.capacity()])
            }
            _ => Err(HistoryError::InvalidIndex { offset, len }),
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

/// Iterator over `(display index, command)` pairs, returned by [`History::list`].
pub struct Entries<'a> {
    history: &'a History,
    next: usize,
    len: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let index = self.next;
        self.next += 1;
        self.history.recall(index).ok().map(|command| (index, command))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}
