//! Last-issued-wins sequencing for overlapping reads.
//!
//! Every read takes a fresh [`FetchToken`] when it is issued, before its
//! future is first polled. When it finishes, its result is committed to the
//! observed state only if no newer read has been issued in the meantime. The
//! caller always gets its own result back, stale or not; only the shared
//! state ignores stale successes. A read dropped before it finishes clears
//! the loading flag if it was still the latest.
//!
//! The token comparison and the commit run together inside the watch
//! channel's lock, so the rule holds on a multi-threaded runtime too.

use std::future::Future;

use tokio::sync::watch;

/// Monotonic per-sequencer read token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

impl FetchToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Observed state shared with subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadState<T> {
    /// Highest token issued so far (0 = none).
    pub highest_issued: u64,
    /// `true` while the most recently issued read is in flight.
    pub loading: bool,
    /// Last committed value.
    pub value: Option<T>,
}

impl<T> Default for ReadState<T> {
    fn default() -> Self {
        Self {
            highest_issued: 0,
            loading: false,
            value: None,
        }
    }
}

/// What a finished read did to the observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Latest read succeeded; its value is now observed.
    Committed,
    /// Latest read failed; loading cleared, value untouched.
    Settled,
    /// A newer read was issued; observed state untouched.
    Stale,
}

/// Issues fetch tokens and guards commits to the observed state.
pub struct RequestSequencer<T> {
    state: watch::Sender<ReadState<T>>,
}

impl<T: Clone> RequestSequencer<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReadState::default());
        Self { state }
    }

    /// Issue the next token and raise the loading flag.
    pub fn begin(&self) -> FetchToken {
        let mut issued = 0;
        self.state.send_modify(|s| {
            s.highest_issued += 1;
            s.loading = true;
            issued = s.highest_issued;
        });
        FetchToken(issued)
    }

    /// Record the outcome of the read that holds `token`.
    pub fn complete<E>(&self, token: FetchToken, outcome: &Result<T, E>) -> Completion {
        let mut completion = Completion::Stale;
        self.state.send_if_modified(|s| {
            if s.highest_issued != token.0 {
                return false;
            }
            s.loading = false;
            completion = match outcome {
                Ok(value) => {
                    s.value = Some(value.clone());
                    Completion::Committed
                }
                Err(_) => Completion::Settled,
            };
            true
        });
        completion
    }

    /// Issue a token held by the returned guard until the read settles.
    pub fn issue(&self) -> InFlight<'_, T> {
        InFlight {
            sequencer: self,
            token: self.begin(),
            settled: false,
        }
    }

    /// Clear the loading flag for a read that will never complete, if it is
    /// still the latest. Returns `true` if the flag was cleared.
    pub fn abandon(&self, token: FetchToken) -> bool {
        self.state.send_if_modified(|s| {
            if s.highest_issued != token.0 || !s.loading {
                return false;
            }
            s.loading = false;
            true
        })
    }

    /// Issue a token now and return a future that runs `read` under it.
    ///
    /// The token is taken at call time, so reads are ordered by when they
    /// were created, not by when they are first polled.
    pub fn run<'a, F, E>(&'a self, read: F) -> impl Future<Output = Result<T, E>> + 'a
    where
        F: Future<Output = Result<T, E>> + 'a,
        E: 'a,
    {
        let in_flight = self.issue();
        async move {
            let outcome = read.await;
            in_flight.finish(&outcome);
            outcome
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn highest_issued(&self) -> u64 {
        self.state.borrow().highest_issued
    }

    /// The last committed value.
    pub fn observed(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// Subscribe to observed-state changes.
    pub fn subscribe(&self) -> watch::Receiver<ReadState<T>> {
        self.state.subscribe()
    }
}

/// A read's token, held until the read finishes or is dropped.
pub struct InFlight<'a, T: Clone> {
    sequencer: &'a RequestSequencer<T>,
    token: FetchToken,
    settled: bool,
}

impl<T: Clone> InFlight<'_, T> {
    pub fn token(&self) -> FetchToken {
        self.token
    }

    /// Record the read's outcome.
    pub fn finish<E>(mut self, outcome: &Result<T, E>) -> Completion {
        self.settled = true;
        let completion = self.sequencer.complete(self.token, outcome);
        if completion == Completion::Stale {
            tracing::debug!(
                token = self.token.0,
                failed = outcome.is_err(),
                "superseded read finished, observed state left unchanged"
            );
        }
        completion
    }
}

impl<T: Clone> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.settled && self.sequencer.abandon(self.token) {
            tracing::debug!(token = self.token.0, "latest read dropped before finishing");
        }
    }
}

impl<T: Clone> Default for RequestSequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_strictly_increase() {
        let seq = RequestSequencer::<u32>::new();
        let a = seq.begin();
        let b = seq.begin();
        let c = seq.begin();
        assert!(a < b && b < c);
        assert_eq!(seq.highest_issued(), 3);
    }

    #[test]
    fn latest_success_commits_and_clears_loading() {
        let seq = RequestSequencer::<u32>::new();
        let t = seq.begin();
        assert!(seq.is_loading());
        assert_eq!(seq.complete::<()>(t, &Ok(7)), Completion::Committed);
        assert!(!seq.is_loading());
        assert_eq!(seq.observed(), Some(7));
    }

    #[test]
    fn older_success_after_newer_is_discarded() {
        let seq = RequestSequencer::<u32>::new();
        let a = seq.begin();
        let b = seq.begin();
        assert_eq!(seq.complete::<()>(b, &Ok(2)), Completion::Committed);
        assert_eq!(seq.complete::<()>(a, &Ok(1)), Completion::Stale);
        assert_eq!(seq.observed(), Some(2));
        assert!(!seq.is_loading());
    }

    #[test]
    fn stale_completion_does_not_clear_loading() {
        let seq = RequestSequencer::<u32>::new();
        let a = seq.begin();
        let _b = seq.begin();
        assert_eq!(seq.complete::<()>(a, &Ok(1)), Completion::Stale);
        assert!(seq.is_loading());
        assert_eq!(seq.observed(), None);
    }

    #[test]
    fn latest_failure_keeps_previous_value() {
        let seq = RequestSequencer::<u32>::new();
        let a = seq.begin();
        seq.complete::<()>(a, &Ok(5));
        let b = seq.begin();
        assert_eq!(seq.complete(b, &Err("boom")), Completion::Settled);
        assert_eq!(seq.observed(), Some(5));
        assert!(!seq.is_loading());
    }

    #[tokio::test]
    async fn run_returns_own_result_even_when_stale() {
        let seq = RequestSequencer::<u32>::new();
        let (tx_a, rx_a) = tokio::sync::oneshot::channel::<u32>();
        let (tx_b, rx_b) = tokio::sync::oneshot::channel::<u32>();

        let read_a = seq.run(async { rx_a.await.map_err(|_| "dropped") });
        let read_b = seq.run(async { rx_b.await.map_err(|_| "dropped") });
        let mut read_a = Box::pin(read_a);
        let mut read_b = Box::pin(read_b);

        // Issue A, then B.
        assert!(futures_poll_once(&mut read_a).await.is_none());
        assert!(futures_poll_once(&mut read_b).await.is_none());

        tx_b.send(2).unwrap();
        assert_eq!(read_b.await, Ok(2));
        tx_a.send(1).unwrap();
        assert_eq!(read_a.await, Ok(1));

        assert_eq!(seq.observed(), Some(2));
        assert!(!seq.is_loading());
    }

    #[tokio::test]
    async fn tokens_follow_creation_order_not_poll_order() {
        let seq = RequestSequencer::<u32>::new();
        let (tx_a, rx_a) = tokio::sync::oneshot::channel::<u32>();
        let (tx_b, rx_b) = tokio::sync::oneshot::channel::<u32>();

        let read_a = seq.run(async { rx_a.await.map_err(|_| "dropped") });
        let read_b = seq.run(async { rx_b.await.map_err(|_| "dropped") });
        assert_eq!(seq.highest_issued(), 2);

        tx_a.send(1).unwrap();
        tx_b.send(2).unwrap();
        let (b, a) = tokio::join!(read_b, read_a);
        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(seq.observed(), Some(2));
    }

    #[test]
    fn dropped_latest_read_clears_loading() {
        let seq = RequestSequencer::<u32>::new();
        let read = seq.issue();
        assert!(seq.is_loading());
        drop(read);
        assert!(!seq.is_loading());
        assert_eq!(seq.observed(), None);
    }

    #[test]
    fn dropped_older_read_keeps_newer_loading() {
        let seq = RequestSequencer::<u32>::new();
        let older = seq.issue();
        let newer = seq.issue();
        drop(older);
        assert!(seq.is_loading());
        assert_eq!(newer.finish::<()>(&Ok(3)), Completion::Committed);
        assert!(!seq.is_loading());
    }

    #[tokio::test]
    async fn timed_out_read_clears_loading() {
        let seq = RequestSequencer::<u32>::new();
        let (_tx, rx) = tokio::sync::oneshot::channel::<u32>();
        let read = seq.run(async { rx.await.map_err(|_| "dropped") });
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), read).await;
        assert!(timed_out.is_err());
        assert!(!seq.is_loading());
    }

    #[tokio::test]
    async fn subscribers_see_commits() {
        let seq = RequestSequencer::<u32>::new();
        let mut rx = seq.subscribe();
        let t = seq.begin();
        seq.complete::<()>(t, &Ok(9));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().value, Some(9));
    }

    /// Poll a future once; `Some` if it completed.
    async fn futures_poll_once<F: Future + Unpin>(fut: &mut F) -> Option<F::Output> {
        use std::task::Poll;
        std::future::poll_fn(|cx| {
            Poll::Ready(match std::pin::Pin::new(&mut *fut).poll(cx) {
                Poll::Ready(v) => Some(v),
                Poll::Pending => None,
            })
        })
        .await
    }
}
