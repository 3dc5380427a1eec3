//! Async Stream Bridge
//!
//! Turns a signal into a `futures` stream so async code can consume it with
//! `StreamExt::next`. Events travel over an unbounded tokio channel: values
//! arrive as `Ok`, an error arrives as a final `Err`, and completion closes
//! the channel.
//!
//! The subscription lives as long as the stream. Dropping the stream
//! disposes the subscription, which stops the producer at its next check.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use super::signal::Signal;
use super::subscriber::Subscriber;
use crate::disposable::{CompositeDisposable, Disposable};

/// A signal's events as an async stream.
///
/// Created by [`Signal::into_stream`].
pub struct SignalStream<T, E> {
    receiver: mpsc::UnboundedReceiver<Result<T, E>>,
    subscription: CompositeDisposable,
}

impl<T, E> Signal<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Subscribe and expose the events as a stream.
    ///
    /// The stream yields `Ok(value)` per value, then either ends (on
    /// completion) or yields one `Err` and ends (on error).
    pub fn into_stream(&self) -> SignalStream<T, E> {
        let (tx, receiver) = mpsc::unbounded_channel();
        let error_tx = tx.clone();

        // The senders live in the subscriber's callbacks, so the channel
        // closes as soon as the subscription terminates or is disposed.
        let subscriber = Subscriber::new(
            move |value| {
                let _ = tx.send(Ok(value));
            },
            move |err| {
                let _ = error_tx.send(Err(err));
            },
            || {},
        );

        let subscription = self.subscribe(subscriber);

        SignalStream {
            receiver,
            subscription,
        }
    }
}

impl<T, E> SignalStream<T, E> {
    /// The subscription backing this stream.
    pub fn subscription(&self) -> &CompositeDisposable {
        &self.subscription
    }
}

impl<T, E> Unpin for SignalStream<T, E> {}

impl<T, E> Stream for SignalStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T, E> Drop for SignalStream<T, E> {
    fn drop(&mut self) {
        if self.subscription.is_disposed() {
            return;
        }

        tracing::debug!("signal stream dropped, disposing subscription");
        if let Err(err) = self.subscription.dispose() {
            tracing::warn!(error = %err, "failed to dispose signal stream subscription");
        }
    }
}

impl<T, E> std::fmt::Debug for SignalStream<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStream")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignalError;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[tokio::test]
    async fn stream_yields_values_then_ends() {
        let mut stream = Signal::<i32>::from_values(vec![1, 2, 3]).into_stream();

        let mut collected = Vec::new();
        while let Some(item) = stream.next().await {
            collected.push(item.unwrap());
        }

        assert_eq!(collected, vec![1, 2, 3]);
        assert!(stream.subscription().is_disposed());
    }

    #[tokio::test]
    async fn stream_yields_error_last() {
        let signal = Signal::single(1).concat_with(&Signal::error(SignalError::msg("boom")));
        let items: Vec<_> = signal.into_stream().collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert_eq!(items[1].as_ref().unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn stream_receives_from_producer_thread() {
        let signal = Signal::<usize>::create(|subscriber| {
            thread::spawn(move || {
                for i in 0..5 {
                    subscriber.on_next(i);
                    thread::sleep(Duration::from_millis(1));
                }
                subscriber.on_completed();
            });
        });

        let items: Vec<usize> = signal
            .into_stream()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn dropping_stream_disposes_subscription() {
        let cleaned = Arc::new(AtomicBool::new(false));
        let cleaned_clone = cleaned.clone();
        let emitted = Arc::new(AtomicUsize::new(0));
        let emitted_clone = emitted.clone();

        let signal = Signal::<usize>::create(move |subscriber| {
            let cleaned = cleaned_clone.clone();
            let _ = subscriber
                .disposable()
                .add_action(move || cleaned.store(true, Ordering::SeqCst));

            let emitted = emitted_clone.clone();
            thread::spawn(move || {
                while !subscriber.is_disposed() {
                    subscriber.on_next(emitted.fetch_add(1, Ordering::SeqCst));
                    thread::sleep(Duration::from_millis(1));
                }
            });
        });

        let mut stream = signal.into_stream();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, 0);

        let subscription = stream.subscription().clone();
        drop(stream);

        assert!(subscription.is_disposed());
        assert!(cleaned.load(Ordering::SeqCst));
    }
}
