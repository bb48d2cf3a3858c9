//! Single-assignment completion cells.

use tokio::sync::oneshot;

use crate::error::AlreadyResolved;

/// Write-once slot that carries a job's terminal outcome to its handle.
///
/// Resolution and cancellation both consume the inner sender, so any second
/// attempt surfaces as [`AlreadyResolved`] instead of silently overwriting
/// or dropping an outcome.
pub(crate) struct ResultCell<T> {
    slot: Option<oneshot::Sender<T>>,
}

impl<T> ResultCell<T> {
    pub(crate) fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { slot: Some(tx) }, rx)
    }

    /// Deliver `value` to the waiting handle.
    ///
    /// The value is discarded if the handle side is already gone; nobody is
    /// waiting, and the cell still counts as resolved.
    pub(crate) fn resolve(&mut self, value: T) -> Result<(), AlreadyResolved> {
        let tx = self.slot.take().ok_or(AlreadyResolved)?;
        let _ = tx.send(value);
        Ok(())
    }

    /// Drop the sender without a value; the handle observes cancellation.
    pub(crate) fn cancel(&mut self) -> Result<(), AlreadyResolved> {
        self.slot.take().map(drop).ok_or(AlreadyResolved)
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        self.slot.is_none()
    }
}
