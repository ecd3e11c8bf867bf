use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{Fuse, FusedStream, FuturesUnordered};
use futures::{Future, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Allows at most one dispatch per interval, across every task that shares it.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Interval>,
}

impl RateLimiter {
    /// A zero interval disables throttling. Must be called from within a tokio runtime.
    pub fn new(every: Duration) -> Self {
        let interval = (!every.is_zero()).then(|| {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self { interval }
    }

    /// Resolves once the next dispatch is allowed. Cancel safe.
    pub async fn ready(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }

    pub fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self.interval.as_mut() {
            Some(interval) => interval.poll_tick(cx).map(|_| ()),
            None => Poll::Ready(()),
        }
    }
}

pin_project! {
    /// Runs the futures of a stream with at most `limit` of them in flight, starting
    /// each one only when the limiter allows it.
    pub struct RateLimited<St>
    where
        St: Stream,
    {
        #[pin]
        stream: Fuse<St>,
        next: Option<St::Item>,
        in_progress_queue: FuturesUnordered<St::Item>,
        limiter: RateLimiter,
        limit: usize,
    }
}

impl<St> fmt::Debug for RateLimited<St>
where
    St: Stream + fmt::Debug,
    St::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimited")
            .field("stream", &self.stream)
            .field("next", &self.next)
            .field("in_progress", &self.in_progress_queue.len())
            .field("limiter", &self.limiter)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<St> RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    pub fn new(stream: St, limiter: RateLimiter, limit: usize) -> Self {
        Self {
            stream: stream.fuse(),
            next: None,
            in_progress_queue: FuturesUnordered::new(),
            limiter,
            limit: limit.max(1),
        }
    }
}

impl<St> Stream for RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    type Item = <St::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // First up, start as many futures as the limit and the limiter allow
        while this.in_progress_queue.len() < *this.limit {
            if this.next.is_none() {
                match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(fut)) => *this.next = Some(fut),
                    Poll::Ready(None) | Poll::Pending => break,
                }
            }
            match this.limiter.poll_ready(cx) {
                Poll::Ready(()) => {
                    if let Some(fut) = this.next.take() {
                        this.in_progress_queue.push(fut);
                    }
                }
                Poll::Pending => break,
            }
        }

        // Attempt to pull the next value from the in_progress_queue
        match this.in_progress_queue.poll_next_unpin(cx) {
            x @ Poll::Pending | x @ Poll::Ready(Some(_)) => return x,
            Poll::Ready(None) => {}
        }

        // If more values are still coming from the stream, we're not done yet
        if this.stream.is_done() && this.next.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let queued = self.in_progress_queue.len() + usize::from(self.next.is_some());
        let (lower, upper) = self.stream.size_hint();
        let lower = lower.saturating_add(queued);
        let upper = match upper {
            Some(x) => x.checked_add(queued),
            None => None,
        };
        (lower, upper)
    }
}

impl<St> FusedStream for RateLimited<St>
where
    St: Stream,
    St::Item: Future,
{
    fn is_terminated(&self) -> bool {
        self.next.is_none() && self.in_progress_queue.is_empty() && self.stream.is_terminated()
    }
}

pub trait RateLimitedExt: Stream {
    fn rate_limited(self, limiter: RateLimiter, limit: usize) -> RateLimited<Self>
    where
        Self::Item: Future,
        Self: Sized,
    {
        RateLimited::new(self, limiter, limit)
    }
}

impl<T: ?Sized> RateLimitedExt for T where T: Stream {}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::stream;
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_out_dispatches() {
        let mut limiter = RateLimiter::new(Duration::from_millis(800));
        let start = Instant::now();

        limiter.ready().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(800));
        limiter.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_unthrottled() {
        let mut limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.ready().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn bounds_in_flight_futures() {
        let running = Rc::new(Cell::new(0));
        let peak = Rc::new(Cell::new(0));

        let mut outputs = stream::iter(0..6)
            .map(|i| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    running.set(running.get() + 1);
                    peak.set(peak.get().max(running.get()));
                    time::sleep(Duration::from_secs(1)).await;
                    running.set(running.get() - 1);
                    i
                }
            })
            .rate_limited(RateLimiter::new(Duration::from_millis(10)), 2)
            .collect::<Vec<_>>()
            .await;

        outputs.sort_unstable();
        assert_eq!(outputs, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(peak.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttles_stream_starts() {
        let start = Instant::now();
        let mut starts = stream::iter(0..3)
            .map(move |_| async move { start.elapsed() })
            .rate_limited(RateLimiter::new(Duration::from_millis(500)), 10)
            .collect::<Vec<_>>()
            .await;

        starts.sort_unstable();
        assert_eq!(starts[0], Duration::ZERO);
        assert!(starts[1] >= Duration::from_millis(500));
        assert!(starts[2] >= Duration::from_millis(1000));
    }
}
