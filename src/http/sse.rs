//! Server-Sent-Events keep-alive stream for `GET /mcp`
//!
//! The stream owns its timer, so a client disconnect (axum dropping the body) releases it.
//! Server shutdown ends every open stream through the shared cancellation token.

use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use axum::response::sse::Event;
use futures::{stream::BoxStream, Stream, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const KEEPALIVE_EVENT: &str = "keepalive";

pub fn keepalive_event() -> Event {
    Event::default().event(KEEPALIVE_EVENT).data("{}")
}

/// Keep-alive event stream for one `GET /mcp` connection. Dropping it stops the timer.
pub struct KeepaliveStream {
    inner: BoxStream<'static, Result<Event, Infallible>>,
    session_id: Option<String>,
}

impl Stream for KeepaliveStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for KeepaliveStream {
    fn drop(&mut self) {
        debug!(
            session_id = self.session_id.as_deref().unwrap_or("-"),
            "keep-alive stream closed"
        );
    }
}

/// Emits one keep-alive event immediately and then one per `period` until cancelled or dropped.
pub fn keepalive_stream(
    period: Duration,
    shutdown: CancellationToken,
    session_id: Option<String>,
) -> KeepaliveStream {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let inner = IntervalStream::new(ticks)
        .map(|_| Ok::<_, Infallible>(keepalive_event()))
        .take_until(shutdown.cancelled_owned())
        .boxed();

    KeepaliveStream { inner, session_id }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::keepalive_stream;

    #[tokio::test(start_paused = true)]
    async fn first_event_is_immediate_then_periodic() {
        let started = Instant::now();
        let stream = keepalive_stream(Duration::from_secs(30), CancellationToken::new(), None);
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());
        assert!(started.elapsed() < Duration::from_secs(1));

        assert!(stream.next().await.is_some());
        assert!(started.elapsed() >= Duration::from_secs(30));

        assert!(stream.next().await.is_some());
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_stream() {
        let token = CancellationToken::new();
        let stream = keepalive_stream(Duration::from_secs(30), token.clone(), None);
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());
        token.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_owns_its_state_and_polls_without_pinning() {
        let token = CancellationToken::new();
        let mut stream = keepalive_stream(
            Duration::from_secs(30),
            token.child_token(),
            Some("session-1".to_string()),
        );

        assert!(stream.next().await.is_some());
        drop(stream);
        assert!(!token.is_cancelled());
    }
}
