use std::future::Future;
use std::time::Duration;

pub use chat_provider::CancelSignal;

/// Marker returned when the cancel signal won a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Waits for whichever of `future` or `cancel` resolves first.
///
/// An already-fired signal wins even if `future` is immediately ready.
pub async fn await_or_cancel<F>(future: F, cancel: &CancelSignal) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        output = future => Ok(output),
    }
}

pub async fn sleep_or_cancel(delay: Duration, cancel: &CancelSignal) -> Result<(), Cancelled> {
    await_or_cancel(tokio::time::sleep(delay), cancel).await
}
