//! Bounded draining of pull sources.
//!
//! A source yields one event per pull and `None` once it is exhausted.
//! [`get_events_from_stream`] pulls strictly one at a time, so the order of
//! the returned batch is the order the source produced.

use crate::Result;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

/// A sequential, single-consumer source of events.
pub trait EventSource: Send {
    type Item: Send;

    /// Wait for the next event. `Ok(None)` means the source is exhausted.
    fn pull(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;
}

/// Outcome of one drain.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamResult<E> {
    pub events: Vec<E>,
    /// Set when the source ran dry before `max_events` were collected.
    pub end_of_stream: bool,
}

/// Pull up to `max_events` events from `source`.
///
/// Stops at the first `None` without pulling again. With `max_events == 0`
/// the source is never touched and `end_of_stream` stays `false`. A pull
/// error aborts the drain and the events collected so far are dropped.
pub async fn get_events_from_stream<S>(
    source: &mut S,
    max_events: usize,
) -> Result<StreamResult<S::Item>>
where
    S: EventSource,
{
    let mut events = Vec::with_capacity(max_events.min(1024));
    let mut end_of_stream = false;

    while events.len() < max_events && !end_of_stream {
        match source.pull().await? {
            Some(event) => events.push(event),
            None => end_of_stream = true,
        }
    }

    debug!(count = events.len(), max_events, end_of_stream, "Drained event batch");
    Ok(StreamResult {
        events,
        end_of_stream,
    })
}

impl<T: Send> EventSource for mpsc::Receiver<T> {
    type Item = T;

    async fn pull(&mut self) -> Result<Option<T>> {
        Ok(self.recv().await)
    }
}

/// Adapts a fallible iterator into an [`EventSource`].
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, T> EventSource for IterSource<I>
where
    I: Iterator<Item = Result<T>> + Send,
    T: Send,
{
    type Item = T;

    async fn pull(&mut self) -> Result<Option<T>> {
        self.iter.next().transpose()
    }
}
