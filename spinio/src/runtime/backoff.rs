use std::time::Duration;

use derive_builder::Builder;

/// Idle-throttling strategy for the hybrid runtime.
///
/// Invoked once per progress-free scheduling round with a
/// monotonically increasing miss count; the count resets to zero on
/// the next round that executes a task. State is per-worker-thread,
/// never shared, so implementations are cloned into each thread.
pub trait Backoff {
    fn apply(&mut self, miss_count: usize);
}

/// Three-tier spin -> yield -> sleep policy.
///
/// Below `spin_limit` misses the worker stays hot with a spin-loop
/// hint, below `yield_limit` it cedes its OS time slice, beyond that
/// it sleeps for `sleep` per round, trading wake-up latency for CPU
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct DefaultBackoff {
    pub spin_limit: usize,
    pub yield_limit: usize,
    pub sleep: Duration,
}

impl Default for DefaultBackoff {
    fn default() -> Self {
        Self {
            spin_limit: 50,
            yield_limit: 200,
            sleep: Duration::from_micros(50),
        }
    }
}

impl Backoff for DefaultBackoff {
    fn apply(&mut self, miss_count: usize) {
        if miss_count < self.spin_limit {
            std::hint::spin_loop();
        } else if miss_count < self.yield_limit {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.sleep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers() {
        let backoff = DefaultBackoff::default();
        assert_eq!(backoff.spin_limit, 50);
        assert_eq!(backoff.yield_limit, 200);
        assert_eq!(backoff.sleep, Duration::from_micros(50));
    }

    #[test]
    fn builder_overrides_tiers() {
        let backoff = DefaultBackoffBuilder::default()
            .spin_limit(5usize)
            .yield_limit(10usize)
            .sleep(Duration::from_micros(1))
            .build()
            .expect("defaults cover every field");
        assert_eq!(backoff.spin_limit, 5);
        assert_eq!(backoff.yield_limit, 10);
    }

    #[test]
    fn apply_never_panics_across_tiers() {
        let mut backoff = DefaultBackoffBuilder::default()
            .yield_limit(2usize)
            .sleep(Duration::from_micros(1))
            .build()
            .expect("defaults cover every field");
        for miss in 1..5 {
            backoff.apply(miss);
        }
    }
}
