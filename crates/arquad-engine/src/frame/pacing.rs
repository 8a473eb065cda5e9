use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Counting semaphore limiting how many frames the GPU may have in flight.
///
/// Tokens live in a bounded channel. The render thread takes one before
/// encoding; the GPU completion callback for that frame puts it back.
pub struct FramePacer {
    tokens_rx: Receiver<()>,
    tokens_tx: Sender<()>,
    max_in_flight: usize,
}

/// Returns one token to its [`FramePacer`]. Consumed on use.
pub struct FrameRelease(Sender<()>);

impl FrameRelease {
    pub fn release(self) {
        // Full means the token was already returned; nothing to do.
        let _ = self.0.try_send(());
    }
}

impl FramePacer {
    /// How long to sleep between pumps while waiting for the GPU.
    const PUMP_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let (tokens_tx, tokens_rx) = bounded(max_in_flight);
        for _ in 0..max_in_flight {
            let _ = tokens_tx.try_send(());
        }
        Self {
            tokens_rx,
            tokens_tx,
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Frames currently holding a token.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.tokens_rx.len()
    }

    pub fn try_acquire(&self) -> bool {
        self.tokens_rx.try_recv().is_ok()
    }

    /// Blocks until a token is available.
    ///
    /// `pump` runs between waits; completion callbacks only fire while the
    /// device is polled, so it should poll the device.
    pub fn acquire_with(&self, mut pump: impl FnMut()) {
        loop {
            if self.try_acquire() {
                return;
            }
            pump();
            match self.tokens_rx.recv_timeout(Self::PUMP_INTERVAL) {
                Ok(()) => return,
                Err(RecvTimeoutError::Timeout) => continue,
                // Unreachable while `self` holds a sender.
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    pub fn release_handle(&self) -> FrameRelease {
        FrameRelease(self.tokens_tx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn single_token_is_taken_once() {
        let pacer = FramePacer::new(1);
        assert!(pacer.try_acquire());
        assert!(!pacer.try_acquire());
        assert_eq!(pacer.in_flight(), 1);

        pacer.release_handle().release();
        assert_eq!(pacer.in_flight(), 0);
        assert!(pacer.try_acquire());
    }

    #[test]
    fn extra_release_does_not_add_tokens() {
        let pacer = FramePacer::new(1);
        pacer.release_handle().release();
        pacer.release_handle().release();
        assert!(pacer.try_acquire());
        assert!(!pacer.try_acquire());
    }

    #[test]
    fn acquire_blocks_until_completion_from_another_thread() {
        let pacer = FramePacer::new(1);
        assert!(pacer.try_acquire());

        let released = Arc::new(AtomicBool::new(false));
        let handle = pacer.release_handle();
        let flag = released.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
            handle.release();
        });

        let start = Instant::now();
        let mut pumps = 0;
        pacer.acquire_with(|| pumps += 1);
        assert!(released.load(Ordering::SeqCst));
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert!(pumps > 0);
        t.join().unwrap();
    }

    #[test]
    fn pump_can_release() {
        // Mirrors the device poll firing the completion callback.
        let pacer = FramePacer::new(1);
        assert!(pacer.try_acquire());
        let mut pending = Some(pacer.release_handle());
        pacer.acquire_with(|| {
            if let Some(r) = pending.take() {
                r.release();
            }
        });
        assert_eq!(pacer.in_flight(), 1);
    }

    #[test]
    fn zero_is_treated_as_one() {
        assert_eq!(FramePacer::new(0).max_in_flight(), 1);
    }
}
