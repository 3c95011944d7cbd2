//! Snowflake identifier generation
//!
//! Identifiers are 63-bit integers laid out as:
//!
//! ```text
//! | 41 bits: ms since epoch | 10 bits: worker id | 12 bits: sequence |
//! ```
//!
//! A generator is an explicit value shared through `Arc<dyn IdGenerator>`;
//! nothing here is a global.

use std::sync::Mutex;
use thiserror::Error;

/// 2014-09-01T00:00:00Z
pub const DEFAULT_EPOCH_MS: u64 = 1_409_529_600_000;

const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

pub const MAX_WORKER_ID: u32 = (1 << WORKER_ID_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("clock moved backwards: last issued at {last_ms}ms, now {now_ms}ms")]
    ClockMovedBackwards { last_ms: u64, now_ms: u64 },

    #[error("system clock is before the generator epoch")]
    ClockBeforeEpoch,

    #[error("timestamp no longer fits in 41 bits")]
    TimestampOverflow,

    #[error("worker id {0} is out of range (0..=1023)")]
    InvalidWorkerId(u32),

    #[error("generator state lock poisoned")]
    LockPoisoned,
}

/// Source of unique request identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<u64, IdError>;
}

/// Wall clock in Unix milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Negative only for clocks set before 1970
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct State {
    last_ms: u64,
    sequence: u64,
}

pub struct Snowflake {
    worker_id: u64,
    epoch_ms: u64,
    clock: Box<dyn Clock>,
    state: Mutex<State>,
}

impl std::fmt::Debug for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snowflake")
            .field("worker_id", &self.worker_id)
            .field("epoch_ms", &self.epoch_ms)
            .finish_non_exhaustive()
    }
}

impl Snowflake {
    pub fn new(worker_id: u32, epoch_ms: u64) -> Result<Self, IdError> {
        Self::with_clock(worker_id, epoch_ms, SystemClock)
    }

    pub fn with_clock(
        worker_id: u32,
        epoch_ms: u64,
        clock: impl Clock + 'static,
    ) -> Result<Self, IdError> {
        if worker_id > MAX_WORKER_ID {
            return Err(IdError::InvalidWorkerId(worker_id));
        }

        Ok(Self {
            worker_id: u64::from(worker_id),
            epoch_ms,
            clock: Box::new(clock),
            state: Mutex::new(State::default()),
        })
    }

    pub fn worker_id(&self) -> u32 {
        self.worker_id as u32
    }

    /// Split an identifier into `(ms since epoch, worker id, sequence)`
    pub fn decompose(id: u64) -> (u64, u32, u64) {
        let timestamp = id >> TIMESTAMP_SHIFT;
        let worker = ((id >> WORKER_ID_SHIFT) & u64::from(MAX_WORKER_ID)) as u32;
        let sequence = id & MAX_SEQUENCE;
        (timestamp, worker, sequence)
    }

    fn elapsed_ms(&self) -> Result<u64, IdError> {
        let elapsed = self
            .clock
            .now_ms()
            .checked_sub(self.epoch_ms)
            .ok_or(IdError::ClockBeforeEpoch)?;

        if elapsed > MAX_TIMESTAMP {
            return Err(IdError::TimestampOverflow);
        }

        Ok(elapsed)
    }
}

impl IdGenerator for Snowflake {
    fn next_id(&self) -> Result<u64, IdError> {
        let mut state = self.state.lock().map_err(|_| IdError::LockPoisoned)?;
        let mut now = self.elapsed_ms()?;

        if now < state.last_ms {
            return Err(IdError::ClockMovedBackwards {
                last_ms: state.last_ms + self.epoch_ms,
                now_ms: now + self.epoch_ms,
            });
        }

        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // 4096 ids issued this millisecond; wait for the next one
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = self.elapsed_ms()?;
                    if now < state.last_ms {
                        return Err(IdError::ClockMovedBackwards {
                            last_ms: state.last_ms + self.epoch_ms,
                            now_ms: now + self.epoch_ms,
                        });
                    }
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now;

        Ok((now << TIMESTAMP_SHIFT) | (self.worker_id << WORKER_ID_SHIFT) | state.sequence)
    }
}
