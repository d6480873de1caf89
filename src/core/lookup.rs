//! Per-slot request state with last-request-wins semantics.
//!
//! Every lookup component owns one or more [`LookupSlot`]s. A request calls
//! [`LookupSlot::begin`] to obtain a token before it awaits anything, and
//! hands the outcome back through [`LookupSlot::complete`]. Only the outcome
//! carrying the latest token is published; older completions are dropped.

use crate::core::error::LookupError;
use tokio::sync::watch;
use tracing::debug;

/// Observable state of one lookup slot.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupState<T> {
    Idle,
    Loading,
    Success(T),
    Failed(LookupError),
}

impl<T> LookupState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            LookupState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LookupError> {
        match self {
            LookupState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Identifies one request issued against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Superseded,
}

#[derive(Debug, Clone)]
struct SlotInner<T> {
    latest: u64,
    state: LookupState<T>,
}

/// Holds the state for a single logical lookup target.
pub struct LookupSlot<T> {
    tx: watch::Sender<SlotInner<T>>,
}

impl<T: Clone> LookupSlot<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SlotInner {
            latest: 0,
            state: LookupState::Idle,
        });
        Self { tx }
    }

    /// Starts a new request. Any earlier request still in flight is superseded
    /// and the previous result is cleared.
    pub fn begin(&self) -> RequestToken {
        let mut token = 0;
        self.tx.send_modify(|inner| {
            inner.latest += 1;
            inner.state = LookupState::Loading;
            token = inner.latest;
        });
        RequestToken(token)
    }

    /// Publishes `outcome` if `token` is still the latest request.
    pub fn complete(&self, token: RequestToken, outcome: Result<T, LookupError>) -> Completion {
        let applied = self.tx.send_if_modified(|inner| {
            if inner.latest != token.0 {
                return false;
            }
            inner.state = match outcome {
                Ok(value) => LookupState::Success(value),
                Err(err) => LookupState::Failed(err),
            };
            true
        });

        if applied {
            Completion::Applied
        } else {
            debug!(token = token.0, "Discarding stale completion");
            Completion::Superseded
        }
    }

    /// Supersedes any in-flight request but keeps the current state.
    pub fn invalidate(&self) {
        self.tx.send_if_modified(|inner| {
            inner.latest += 1;
            false
        });
    }

    /// Supersedes any in-flight request and returns to `Idle`.
    pub fn reset(&self) {
        self.tx.send_modify(|inner| {
            inner.latest += 1;
            inner.state = LookupState::Idle;
        });
    }

    /// Edits the published state in place without superseding anything.
    /// Watchers are notified only when `edit` returns `true`.
    pub fn modify(&self, edit: impl FnOnce(&mut LookupState<T>) -> bool) -> bool {
        self.tx.send_if_modified(|inner| edit(&mut inner.state))
    }

    pub fn state(&self) -> LookupState<T> {
        self.tx.borrow().state.clone()
    }

    /// Whether `token` is still the most recent request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tx.borrow().latest == token.0
    }

    /// Receives a notification every time the published state changes.
    pub fn subscribe(&self) -> LookupWatcher<T> {
        LookupWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for LookupSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`LookupSlot`], for presentation code.
pub struct LookupWatcher<T> {
    rx: watch::Receiver<SlotInner<T>>,
}

impl<T: Clone> LookupWatcher<T> {
    /// Waits for the next state change. Returns `None` once the slot is dropped.
    pub async fn changed(&mut self) -> Option<LookupState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    pub fn current(&self) -> LookupState<T> {
        self.rx.borrow().state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_sets_loading_and_clears_success() {
        let slot = LookupSlot::<u32>::new();
        assert_eq!(slot.state(), LookupState::Idle);

        let token = slot.begin();
        assert!(slot.state().is_loading());
        assert_eq!(slot.complete(token, Ok(7)), Completion::Applied);
        assert_eq!(slot.state(), LookupState::Success(7));

        slot.begin();
        assert_eq!(slot.state(), LookupState::Loading);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let slot = LookupSlot::<&'static str>::new();
        let first = slot.begin();
        let second = slot.begin();

        assert_eq!(slot.complete(second, Ok("MSFT")), Completion::Applied);
        assert_eq!(slot.complete(first, Ok("AAPL")), Completion::Superseded);
        assert_eq!(slot.state(), LookupState::Success("MSFT"));
    }

    #[test]
    fn test_stale_failure_does_not_overwrite() {
        let slot = LookupSlot::<u32>::new();
        let first = slot.begin();
        let second = slot.begin();

        slot.complete(second, Ok(1));
        slot.complete(
            first,
            Err(LookupError::Transport("connection reset".to_string())),
        );
        assert_eq!(slot.state(), LookupState::Success(1));
    }

    #[test]
    fn test_invalidate_keeps_state_but_drops_in_flight() {
        let slot = LookupSlot::<u32>::new();
        let token = slot.begin();
        slot.invalidate();
        assert!(!slot.is_current(token));
        assert_eq!(slot.complete(token, Ok(3)), Completion::Superseded);
        assert_eq!(slot.state(), LookupState::Loading);

        slot.reset();
        assert_eq!(slot.state(), LookupState::Idle);
    }

    #[test]
    fn test_modify_edits_state_without_superseding() {
        let slot = LookupSlot::<u32>::new();
        let token = slot.begin();
        slot.complete(token, Ok(1));

        let changed = slot.modify(|state| match state {
            LookupState::Success(value) => {
                *value += 1;
                true
            }
            _ => false,
        });
        assert!(changed);
        assert!(slot.is_current(token));
        assert_eq!(slot.state(), LookupState::Success(2));

        assert!(!slot.modify(|_| false));
    }

    #[tokio::test]
    async fn test_watcher_sees_published_state() {
        let slot = LookupSlot::<u32>::new();
        let mut watcher = slot.subscribe();

        let token = slot.begin();
        assert_eq!(watcher.changed().await, Some(LookupState::Loading));

        slot.complete(token, Ok(42));
        assert_eq!(watcher.changed().await, Some(LookupState::Success(42)));
        assert_eq!(watcher.current(), LookupState::Success(42));
    }
}
