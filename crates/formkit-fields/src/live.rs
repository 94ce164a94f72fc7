//! Hot observable values
//!
//! A [`LiveValue`] always holds its latest value. New subscribers see that
//! value immediately, so late observers never miss the current state.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Latest-value holder with any number of subscribers
#[derive(Debug)]
pub struct LiveValue<T> {
    tx: watch::Sender<T>,
    emissions: AtomicU64,
}

impl<T: Clone> LiveValue<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            emissions: AtomicU64::new(0),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value and wake every subscriber, even when unchanged
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
        self.emissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Receiver primed with the current value
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of publishes since creation
    pub fn emissions(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Default> Default for LiveValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
