//! Single-flight coalescing of concurrent identical requests.
//!
//! A process-wide map from key to the computation currently in flight for
//! that key. The first caller becomes the leader and runs the producer;
//! every concurrent caller for the same key awaits the leader's outcome.
//! Once the outcome (success or error) is published the slot is removed,
//! so the group deduplicates concurrency, not history — durable
//! memoization belongs to the module repository.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::watch;

use crate::error::Error;

type Outcome = Result<Bytes, Error>;
type Slot = watch::Receiver<Option<Outcome>>;

#[derive(Debug, Default)]
pub struct SingleFlight {
    inflight: Mutex<HashMap<String, Slot>>,
}

enum Role {
    Leader(watch::Sender<Option<Outcome>>),
    Follower(Slot),
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `produce` under `key`, or await the invocation already in
    /// flight for the same key.
    ///
    /// All callers of one flight observe the same outcome. If the leading
    /// caller is dropped mid-flight, waiters observe [`Error::Cancelled`]
    /// and the next call for the key starts fresh.
    pub async fn run<F, Fut>(&self, key: &str, produce: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let role = {
            let mut inflight = self.inflight.lock().expect("single-flight map poisoned");
            match inflight.get(key) {
                Some(slot) => Role::Follower(slot.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.to_string(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Leader(tx) => {
                // The guard publishes Cancelled if this future is dropped
                // before the producer finishes, so followers never hang.
                let mut flight = Flight {
                    group: self,
                    key,
                    tx: Some(tx),
                };
                let outcome = produce().await;
                flight.publish(outcome.clone());
                outcome
            }
            Role::Follower(mut slot) => loop {
                if let Some(outcome) = slot.borrow_and_update().as_ref() {
                    return outcome.clone();
                }
                if slot.changed().await.is_err() {
                    return Err(Error::Cancelled);
                }
            },
        }
    }
}

struct Flight<'a> {
    group: &'a SingleFlight,
    key: &'a str,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl Flight<'_> {
    fn publish(&mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            // Remove the slot before publishing: a caller arriving after
            // the outcome is visible must start a fresh flight.
            self.group
                .inflight
                .lock()
                .expect("single-flight map poisoned")
                .remove(self.key);
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.publish(Err(Error::Cancelled));
    }
}
