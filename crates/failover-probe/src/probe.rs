//! The health probe seam.

use async_trait::async_trait;

/// Trait for sampling WAN link health.
///
/// Implementations must not fail or block indefinitely: every error is
/// reported as `false`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Sample the link once. `true` only if the link is confirmed up.
    async fn link_up(&self) -> bool;
}

/// A probe that replays a fixed sequence of samples.
///
/// Once the script is exhausted it keeps returning the last sample (or
/// `false` for an empty script).
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    samples: parking_lot::Mutex<std::collections::VecDeque<bool>>,
    last: parking_lot::Mutex<bool>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl ScriptedProbe {
    /// Create a probe that replays `samples` in order.
    #[must_use]
    pub fn new(samples: impl IntoIterator<Item = bool>) -> Self {
        Self {
            samples: parking_lot::Mutex::new(samples.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Create a probe that always reports `up`.
    #[must_use]
    pub fn always(up: bool) -> Self {
        let probe = Self::new([]);
        *probe.last.lock() = up;
        probe
    }

    /// Append samples to the script.
    pub fn push(&self, samples: impl IntoIterator<Item = bool>) {
        self.samples.lock().extend(samples);
    }

    /// Number of times the probe has been sampled.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn link_up(&self) -> bool {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(sample) = self.samples.lock().pop_front() {
            *last = sample;
        }
        *last
    }
}
