// Selection supersession for a single client. Each `select` bumps a generation counter; a
// resolution started under an older generation is stale and its result is dropped.

use tokio::sync::watch;

use crate::selection::Selection;

#[derive(Debug)]
pub struct SelectionTracker {
    generation: watch::Sender<u64>,
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionTracker {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }

    /// Makes `selection` the active one and returns the handle its resolution runs under.
    pub fn select(&self, selection: Selection) -> Resolution {
        let mut generation = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        Resolution {
            selection,
            generation,
            active: self.generation.subscribe(),
        }
    }

    pub fn current_generation(&self) -> u64 {
        *self.generation.borrow()
    }
}

/// Identity captured when a resolution starts.
#[derive(Debug)]
pub struct Resolution {
    pub selection: Selection,
    generation: u64,
    active: watch::Receiver<u64>,
}

impl Resolution {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        *self.active.borrow() == self.generation
    }

    /// Passes `value` through only if no newer selection has been made since this one started.
    pub fn settle<T>(&self, value: T) -> Option<T> {
        if self.is_current() {
            Some(value)
        } else {
            tracing::debug!(
                selection = %self.selection,
                generation = self.generation,
                "discarding superseded resolution"
            );
            None
        }
    }
}
