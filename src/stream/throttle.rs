//! Stream throttling utilities

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Throttle the stream to emit at most once per interval
    ///
    /// Uses "latest-wins" semantics - if multiple items arrive
    /// during an interval, only the latest is emitted. The first item passes
    /// straight through, and the last buffered item is still delivered when the
    /// source ends.
    fn throttle(self, duration: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, duration)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// A stream combinator that throttles emission rate
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, duration: Duration) -> Self {
        let mut interval = interval(duration);
        // Don't burst after a quiet period
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, done: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain everything available, keeping only the latest
        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.done { Poll::Ready(None) } else { Poll::Pending };
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}
