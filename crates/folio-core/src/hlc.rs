//! Hybrid Logical Clock.
//!
//! An [`Hlc`] packs a 48-bit physical component (milliseconds since the Unix
//! epoch) and a 16-bit logical counter into one `u64`, so comparing two
//! timestamps is a plain integer comparison.
//!
//! [`HybridLogicalClock::now`] never returns a value less than or equal to a
//! value it returned before. When the wall clock stalls or jumps backward the
//! logical counter absorbs the difference; when the counter overflows it
//! carries into the physical part, which keeps the sequence monotonic.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

const LOGICAL_BITS: u32 = 16;
const LOGICAL_MASK: u64 = (1 << LOGICAL_BITS) - 1;
const MAX_PHYSICAL_MS: u64 = u64::MAX >> LOGICAL_BITS;

/// A hybrid logical timestamp. Totally ordered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hlc(u64);

impl Hlc {
    /// The smallest timestamp.
    pub const ZERO: Hlc = Hlc(0);

    /// Build a timestamp from its components.
    #[must_use]
    pub fn new(physical_ms: u64, logical: u16) -> Self {
        Self((physical_ms.min(MAX_PHYSICAL_MS) << LOGICAL_BITS) | u64::from(logical))
    }

    /// Wrap a raw packed value.
    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw packed value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Physical component, in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn physical_ms(self) -> u64 {
        self.0 >> LOGICAL_BITS
    }

    /// Logical counter.
    #[must_use]
    pub fn logical(self) -> u16 {
        // Masked to 16 bits, cannot truncate.
        u16::try_from(self.0 & LOGICAL_MASK).unwrap_or(u16::MAX)
    }

    /// Signed representation for SQL `BIGINT` / `INTEGER` columns.
    ///
    /// Physical time fits in 47 bits until the year 6429, so real
    /// timestamps never saturate.
    #[must_use]
    pub fn to_i64(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    /// Inverse of [`Hlc::to_i64`]. Negative column values clamp to zero.
    #[must_use]
    pub fn from_i64(raw: i64) -> Self {
        Self(u64::try_from(raw).unwrap_or(0))
    }
}

impl fmt::Display for Hlc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:05}", self.physical_ms(), self.logical())
    }
}

/// Source of physical time for a [`HybridLogicalClock`].
pub trait PhysicalClock: Send + Sync {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Physical clock backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl PhysicalClock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Per-node hybrid logical clock.
///
/// Lock-free: the last issued value lives in an [`AtomicU64`] and every
/// read-then-increment happens in a single compare-and-swap loop, so
/// concurrent callers never observe the same value.
pub struct HybridLogicalClock {
    last: AtomicU64,
    physical: Box<dyn PhysicalClock>,
}

impl HybridLogicalClock {
    /// Create a clock driven by the system wall clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_physical_clock(SystemClock)
    }

    /// Create a clock driven by a custom physical time source.
    #[must_use]
    pub fn with_physical_clock(physical: impl PhysicalClock + 'static) -> Self {
        Self {
            last: AtomicU64::new(0),
            physical: Box::new(physical),
        }
    }

    /// Issue a new timestamp, strictly greater than every previous one.
    pub fn now(&self) -> Hlc {
        let wall = Hlc::new(self.physical.now_ms(), 0).as_u64();
        let prev = self.advance(|last| next_after(last, wall));
        Hlc(next_after(prev, wall))
    }

    /// Merge a timestamp received from another node.
    ///
    /// Returns a local timestamp strictly greater than both `remote` and
    /// every value this clock issued before.
    pub fn observe(&self, remote: Hlc) -> Hlc {
        let wall = Hlc::new(self.physical.now_ms(), 0).as_u64();
        let step = |last: u64| next_after(last.max(remote.0), wall);
        let prev = self.advance(step);
        Hlc(step(prev))
    }

    /// The most recently issued timestamp (or [`Hlc::ZERO`]).
    pub fn last(&self) -> Hlc {
        Hlc(self.last.load(Ordering::Acquire))
    }

    fn advance(&self, step: impl Fn(u64) -> u64) -> u64 {
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(step(last)))
        {
            Ok(prev) | Err(prev) => prev,
        }
    }
}

impl Default for HybridLogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HybridLogicalClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridLogicalClock")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}

fn next_after(last: u64, wall: u64) -> u64 {
    if wall > last { wall } else { last.saturating_add(1) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    /// Manually driven physical clock.
    #[derive(Clone, Default)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn set(&self, ms: u64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl PhysicalClock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn components_round_trip() {
        let hlc = Hlc::new(1_700_000_000_123, 7);
        assert_eq!(hlc.physical_ms(), 1_700_000_000_123);
        assert_eq!(hlc.logical(), 7);
    }

    #[test]
    fn ordering_is_physical_then_logical() {
        assert!(Hlc::new(10, 65_535) < Hlc::new(11, 0));
        assert!(Hlc::new(10, 1) < Hlc::new(10, 2));
    }

    #[test]
    fn i64_conversion_round_trips() {
        let hlc = Hlc::new(1_700_000_000_000, 42);
        assert_eq!(Hlc::from_i64(hlc.to_i64()), hlc);
        assert_eq!(Hlc::from_i64(-5), Hlc::ZERO);
    }

    #[test]
    fn display_shows_components() {
        assert_eq!(Hlc::new(1000, 3).to_string(), "1000.00003");
    }

    #[test]
    fn now_tracks_wall_clock() {
        let wall = ManualClock::default();
        wall.set(5_000);
        let clock = HybridLogicalClock::with_physical_clock(wall.clone());
        let ts = clock.now();
        assert_eq!(ts, Hlc::new(5_000, 0));
        wall.set(6_000);
        assert_eq!(clock.now(), Hlc::new(6_000, 0));
    }

    #[test]
    fn same_millisecond_increments_logical() {
        let wall = ManualClock::default();
        wall.set(5_000);
        let clock = HybridLogicalClock::with_physical_clock(wall);
        let a = clock.now();
        let b = clock.now();
        let c = clock.now();
        assert_eq!(a, Hlc::new(5_000, 0));
        assert_eq!(b, Hlc::new(5_000, 1));
        assert_eq!(c, Hlc::new(5_000, 2));
    }

    #[test]
    fn backward_wall_clock_jump_stays_monotonic() {
        let wall = ManualClock::default();
        wall.set(10_000);
        let clock = HybridLogicalClock::with_physical_clock(wall.clone());
        let before = clock.now();
        wall.set(2_000);
        let after = clock.now();
        assert!(after > before);
        assert_eq!(after.physical_ms(), 10_000);
        assert_eq!(after.logical(), 1);
    }

    #[test]
    fn logical_overflow_carries_into_physical() {
        let clock = HybridLogicalClock::with_physical_clock(ManualClock::default());
        let _ = clock.observe(Hlc::new(100, u16::MAX));
        let next = clock.now();
        assert!(next > Hlc::new(100, u16::MAX));
        assert_eq!(next, Hlc::new(101, 1));
    }

    #[test]
    fn observe_moves_past_remote() {
        let wall = ManualClock::default();
        wall.set(1_000);
        let clock = HybridLogicalClock::with_physical_clock(wall);
        let remote = Hlc::new(9_000, 4);
        let merged = clock.observe(remote);
        assert!(merged > remote);
        assert!(clock.now() > merged);
    }

    #[test]
    fn observe_older_remote_is_still_monotonic() {
        let wall = ManualClock::default();
        wall.set(5_000);
        let clock = HybridLogicalClock::with_physical_clock(wall);
        let local = clock.now();
        let merged = clock.observe(Hlc::new(1, 0));
        assert!(merged > local);
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let clock = Arc::new(HybridLogicalClock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || (0..1_000).map(|_| clock.now()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<Hlc> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn last_reports_most_recent() {
        let clock = HybridLogicalClock::new();
        assert_eq!(clock.last(), Hlc::ZERO);
        let ts = clock.now();
        assert_eq!(clock.last(), ts);
    }

    proptest! {
        #[test]
        fn strictly_increasing_under_arbitrary_wall_clock(
            walls in proptest::collection::vec(0u64..1_000_000, 1..200)
        ) {
            let wall = ManualClock::default();
            let clock = HybridLogicalClock::with_physical_clock(wall.clone());
            let mut prev = Hlc::ZERO;
            for ms in walls {
                wall.set(ms);
                let ts = clock.now();
                prop_assert!(ts > prev);
                prop_assert!(ts >= Hlc::new(ms, 0));
                prev = ts;
            }
        }
    }
}
