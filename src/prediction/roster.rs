use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered model ids with a round-robin cursor
#[derive(Debug)]
pub struct ModelRoster {
    models: Vec<String>,
    cursor: AtomicUsize,
}

impl ModelRoster {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model the next tick will use, `None` for an empty roster
    pub fn current(&self) -> Option<&str> {
        let cursor = self.cursor.load(Ordering::Acquire);
        self.models.get(cursor).map(String::as_str)
    }

    /// Move the cursor one model forward, wrapping at the end
    pub fn advance(&self) {
        let len = self.models.len();
        if len == 0 {
            return;
        }
        let _ = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % len)
            });
    }
}
