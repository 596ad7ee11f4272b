//! Lock-free Snowflake-style id generator.
//!
//! Generation state lives in one `AtomicU64`, mutated only by
//! `compare_exchange_weak` — no generator-side mutex, in the same style as
//! the other hot-path atomic counters in this workspace (`CircuitBreakerBehavior`'s
//! `AtomicU32` failure count, `RecoverySupervisor`'s per-component `AtomicBool`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::IdGenError;
use crate::layout::SnowflakeLayout;

const DEFAULT_SPIN_BUDGET: Duration = Duration::from_millis(10);

fn system_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}

/// A generated id decomposed back into its constituent fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedId {
    pub timestamp_millis: i64,
    pub worker_id: u64,
    pub sequence: u64,
}

/// Worker-id auto-detection order: `WORKER_ID` env, then
/// `POD_INDEX` env, then `hash(HOSTNAME) mod 2^workerIdBits`, then a
/// caller-supplied fallback.
pub fn auto_detect_worker_id(worker_id_bits: u8, fallback: u64) -> u64 {
    let max = (1u64 << worker_id_bits).max(1);

    if let Ok(raw) = std::env::var("WORKER_ID") {
        if let Ok(parsed) = raw.trim().parse::<u64>() {
            return parsed % max;
        }
    }
    if let Ok(raw) = std::env::var("POD_INDEX") {
        if let Ok(parsed) = raw.trim().parse::<u64>() {
            return parsed % max;
        }
    }
    if let Ok(hostname) = std::env::var("HOSTNAME") {
        return hash_str(&hostname) % max;
    }
    fallback % max
}

fn hash_str(value: &str) -> u64 {
    // FNV-1a — simple, dependency-free, stable across runs.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in value.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Process-wide Snowflake id generator. Construct once per process;
/// generation state is otherwise immutable once constructed, so there is no
/// setter for worker id or layout at runtime.
pub struct IdGenerator {
    layout: SnowflakeLayout,
    worker_id: u64,
    state: AtomicU64,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
    spin_budget: Duration,
}

impl IdGenerator {
    pub fn new(layout: SnowflakeLayout, worker_id: u64) -> Result<Self, IdGenError> {
        Self::with_clock(layout, worker_id, system_clock_millis)
    }

    /// Constructor that takes an explicit clock; used by tests to inject
    /// clock regression (S10) without sleeping in wall-clock time.
    pub fn with_clock(
        layout: SnowflakeLayout,
        worker_id: u64,
        clock: impl Fn() -> i64 + Send + Sync + 'static,
    ) -> Result<Self, IdGenError> {
        let max_worker_id = layout.max_worker_id();
        if worker_id > max_worker_id {
            return Err(IdGenError::InvalidWorkerId {
                worker_id,
                worker_id_bits: layout.worker_id_bits,
                max: max_worker_id,
            });
        }
        Ok(Self {
            layout,
            worker_id,
            state: AtomicU64::new(0),
            clock: Box::new(clock),
            spin_budget: DEFAULT_SPIN_BUDGET,
        })
    }

    pub fn layout(&self) -> SnowflakeLayout {
        self.layout
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    fn current_tick(&self, now_millis: i64) -> i64 {
        (now_millis - self.layout.epoch_millis) / self.layout.tick_millis as i64
    }

    fn compose(&self, tick: i64, sequence: u64) -> i64 {
        (tick << (self.layout.worker_id_bits + self.layout.sequence_bits))
            | ((self.worker_id as i64) << self.layout.sequence_bits)
            | sequence as i64
    }

    /// Generates a single id. Safe to call concurrently from any number of
    /// producers without locking.
    pub fn next_id(&self) -> Result<i64, IdGenError> {
        let spin_start = Instant::now();
        loop {
            let now = (self.clock)();
            let packed = self.state.load(Ordering::SeqCst);
            let last_tick = (packed >> self.layout.sequence_bits) as i64;
            let last_seq = packed & self.layout.sequence_mask();
            let now_tick = self.current_tick(now);

            if now_tick < last_tick {
                return Err(IdGenError::clock_regression(last_tick - now_tick));
            }

            let (tick, sequence) = if now_tick == last_tick {
                let seq = (last_seq + 1) & self.layout.sequence_mask();
                if seq == 0 {
                    if spin_start.elapsed() > self.spin_budget {
                        return Err(IdGenError::sequence_exhausted(self.spin_budget.as_millis() as u64));
                    }
                    std::hint::spin_loop();
                    continue;
                }
                (last_tick, seq)
            } else {
                (now_tick, 0)
            };

            let new_packed = ((tick as u64) << self.layout.sequence_bits) | sequence;
            if self
                .state
                .compare_exchange_weak(packed, new_packed, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(self.compose(tick, sequence));
            }
            std::hint::spin_loop();
        }
    }

    /// Fills `buf` with freshly generated ids, reserving a contiguous
    /// sequence range in one CAS when it fits in the current tick; falls
    /// back to the per-id loop across millisecond boundaries otherwise.
    pub fn next_ids(&self, buf: &mut [i64]) -> Result<usize, IdGenError> {
        let k = buf.len() as u64;
        if k == 0 {
            return Ok(0);
        }

        loop {
            let now = (self.clock)();
            let packed = self.state.load(Ordering::SeqCst);
            let last_tick = (packed >> self.layout.sequence_bits) as i64;
            let last_seq = packed & self.layout.sequence_mask();
            let now_tick = self.current_tick(now);

            if now_tick < last_tick {
                return Err(IdGenError::clock_regression(last_tick - now_tick));
            }

            let (tick, base_seq) = if now_tick == last_tick {
                (last_tick, last_seq + 1)
            } else {
                (now_tick, 0)
            };

            if base_seq + k <= self.layout.sequence_mask() + 1 {
                let new_seq = base_seq + k - 1;
                let new_packed = ((tick as u64) << self.layout.sequence_bits) | new_seq;
                if self
                    .state
                    .compare_exchange_weak(packed, new_packed, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    for (i, slot) in buf.iter_mut().enumerate() {
                        *slot = self.compose(tick, base_seq + i as u64);
                    }
                    return Ok(buf.len());
                }
                std::hint::spin_loop();
                continue;
            }

            for slot in buf.iter_mut() {
                *slot = self.next_id()?;
            }
            return Ok(buf.len());
        }
    }

    /// Decomposes a previously generated id back into timestamp/worker/sequence.
    pub fn parse(&self, id: i64) -> ParsedId {
        let id = id as u64;
        let sequence = id & self.layout.sequence_mask();
        let worker_id = (id >> self.layout.sequence_bits) & self.layout.max_worker_id();
        let tick = id >> (self.layout.worker_id_bits + self.layout.sequence_bits);
        let timestamp_millis = self.layout.epoch_millis + (tick as i64) * self.layout.tick_millis as i64;
        ParsedId { timestamp_millis, worker_id, sequence }
    }
}
