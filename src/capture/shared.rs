//! Shared access serializer and snapshot cache
//!
//! One lock wraps the capture source and the snapshot buffer. Every
//! hardware touch, whether from the local renderer or the snapshot path,
//! goes through [`SharedCamera::with_frame`], so two consumers can never
//! interleave a dequeue/enqueue pair. The snapshot is written only inside
//! that same lock, so readers always observe a complete frame.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::CaptureError;

use super::traits::VideoSource;

/// Back-off policy for the transient no-frame condition
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts before [`SharedCamera::snapshot`] gives up
    pub attempts: u32,
    /// Sleep between attempts, with the lock released
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 100,
            delay: Duration::from_millis(10),
        }
    }
}

struct Inner<S> {
    source: S,
    snapshot: Option<Bytes>,
}

/// A capture source shared between concurrent consumers
///
/// Dimensions are read at construction and immutable afterwards, so they
/// can be read without taking the lock.
pub struct SharedCamera<S> {
    inner: Mutex<Inner<S>>,
    width: u32,
    height: u32,
    retry: RetryPolicy,
}

impl<S: VideoSource> SharedCamera<S> {
    /// Wrap a capture source
    pub fn new(source: S) -> Self {
        let width = source.width();
        let height = source.height();

        Self {
            inner: Mutex::new(Inner {
                source,
                snapshot: None,
            }),
            width,
            height,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the no-frame back-off policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Capture width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Capture height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Turn streaming on
    pub async fn start(&self) -> Result<(), crate::error::DeviceError> {
        self.inner.lock().await.source.start()
    }

    /// Turn streaming off
    pub async fn stop(&self) -> Result<(), crate::error::DeviceError> {
        self.inner.lock().await.source.stop()
    }

    /// Release the underlying device
    pub async fn close(&self) {
        self.inner.lock().await.source.close();
    }

    /// Run `consume` over the next captured frame
    ///
    /// Acquire, consume and release happen atomically with respect to every
    /// other caller on this camera. On [`CaptureError::NotReady`] the lock
    /// is released immediately; callers retry after a short delay rather
    /// than holding the serializer.
    pub async fn with_frame<R>(
        &self,
        consume: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, CaptureError> {
        let mut inner = self.inner.lock().await;

        let mut consume = Some(consume);
        let mut out = None;
        inner.source.with_frame(&mut |bytes| {
            if let Some(consume) = consume.take() {
                out = Some(consume(bytes));
            }
        })?;

        // A source that returns Ok must have visited exactly once.
        out.ok_or(CaptureError::NotReady)
    }

    /// Capture a frame into an owned snapshot
    ///
    /// Copies the next frame out of the ring, replaces the cached snapshot
    /// wholesale and returns the new copy. Retries the no-frame condition
    /// up to the configured budget, sleeping with the lock released between
    /// attempts, so a capture concurrent with rendering is delayed, never
    /// corrupted.
    pub async fn snapshot(&self) -> Result<Bytes, CaptureError> {
        let mut attempt = 0;

        loop {
            {
                let mut inner = self.inner.lock().await;

                let mut copied: Option<Bytes> = None;
                let result = inner.source.with_frame(&mut |bytes| {
                    copied = Some(Bytes::copy_from_slice(bytes));
                });

                match result {
                    Ok(()) => {
                        if let Some(bytes) = copied {
                            // Previous snapshot is dropped as a whole.
                            inner.snapshot = Some(bytes.clone());
                            tracing::debug!(len = bytes.len(), "snapshot refreshed");
                            return Ok(bytes);
                        }
                    }
                    Err(CaptureError::NotReady) => {}
                    Err(e) => return Err(e),
                }
            }

            attempt += 1;
            if attempt > self.retry.attempts {
                return Err(CaptureError::NotReady);
            }
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    /// The most recent snapshot, if one was ever captured
    pub async fn last_snapshot(&self) -> Option<Bytes> {
        self.inner.lock().await.snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::capture::mock::MockSource;

    fn frame(byte: u8, len: usize) -> Vec<u8> {
        vec![byte; len]
    }

    #[tokio::test]
    async fn test_with_frame_returns_consumer_result() {
        let camera = SharedCamera::new(MockSource::streaming(4, 2, vec![frame(0x42, 16)]));

        let sum: u32 = camera
            .with_frame(|bytes| bytes.iter().map(|b| *b as u32).sum())
            .await
            .unwrap();

        assert_eq!(sum, 0x42 * 16);
    }

    #[tokio::test]
    async fn test_never_more_than_one_view_outstanding() {
        let source = MockSource::streaming(4, 2, vec![frame(1, 16), frame(2, 16)]);
        let outstanding = source.outstanding();
        let max_seen = source.max_outstanding();
        let camera = Arc::new(SharedCamera::new(source));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let camera = Arc::clone(&camera);
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    camera.with_frame(|_| ()).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(outstanding.load(Ordering::SeqCst), 0);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_equals_latest_acquire() {
        let camera = SharedCamera::new(MockSource::streaming(
            4,
            2,
            vec![frame(0xAA, 16), frame(0xBB, 16)],
        ));

        let first = camera.snapshot().await.unwrap();
        assert_eq!(&first[..], &frame(0xAA, 16)[..]);
        assert_eq!(camera.last_snapshot().await.unwrap(), first);

        let second = camera.snapshot().await.unwrap();
        assert_eq!(&second[..], &frame(0xBB, 16)[..]);
        assert_eq!(camera.last_snapshot().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_concurrent_snapshots_are_never_mixed() {
        let camera = Arc::new(SharedCamera::new(MockSource::streaming(
            4,
            2,
            vec![frame(0xAA, 1024), frame(0xBB, 1024)],
        )));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let camera = Arc::clone(&camera);
            tasks.push(tokio::spawn(async move { camera.snapshot().await.unwrap() }));
        }

        for task in tasks {
            let snapshot = task.await.unwrap();
            let first = snapshot[0];
            assert!(first == 0xAA || first == 0xBB);
            assert!(snapshot.iter().all(|b| *b == first), "mixed snapshot bytes");
        }
    }

    #[tokio::test]
    async fn test_not_ready_backs_off_then_succeeds() {
        let source =
            MockSource::streaming(4, 2, vec![frame(0x11, 8)]).not_ready_first(3);
        let camera = SharedCamera::new(source).with_retry(RetryPolicy {
            attempts: 10,
            delay: Duration::from_millis(1),
        });

        let snapshot = camera.snapshot().await.unwrap();
        assert_eq!(&snapshot[..], &frame(0x11, 8)[..]);
    }

    #[tokio::test]
    async fn test_not_ready_budget_exhausted() {
        let source = MockSource::streaming(4, 2, vec![frame(0, 8)]).not_ready_first(u32::MAX);
        let camera = SharedCamera::new(source).with_retry(RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(1),
        });

        let err = camera.snapshot().await.unwrap_err();
        assert!(err.is_not_ready());
    }

    #[tokio::test]
    async fn test_single_attempt_with_frame_surfaces_not_ready() {
        let source = MockSource::streaming(4, 2, vec![frame(0, 8)]).not_ready_first(1);
        let camera = SharedCamera::new(source);

        let err = camera.with_frame(|_| ()).await.unwrap_err();
        assert!(err.is_not_ready());

        // Next attempt finds a frame.
        assert!(camera.with_frame(|_| ()).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capture_under_contention_is_delayed_not_failed() {
        let camera = Arc::new(SharedCamera::new(MockSource::streaming(
            4,
            2,
            vec![frame(0xCC, 64)],
        )));

        let hold = Duration::from_millis(50);
        let renderer = {
            let camera = Arc::clone(&camera);
            tokio::spawn(async move {
                camera
                    .with_frame(|_| std::thread::sleep(hold))
                    .await
                    .unwrap();
            })
        };

        // Give the renderer time to take the lock.
        tokio::time::sleep(Duration::from_millis(5)).await;

        let started = Instant::now();
        let snapshot = camera.snapshot().await.unwrap();
        assert_eq!(&snapshot[..], &frame(0xCC, 64)[..]);
        assert!(started.elapsed() >= Duration::from_millis(20));

        renderer.await.unwrap();
    }
}
