//! Priority allocation for middleware contributors.
//!
//! # Responsibilities
//! - Hold the reserved single-slot priorities owned by the server itself
//! - Partition the remaining priority space into open bands
//! - Hand out clamped, monotonically increasing priorities within a band
//!
//! Lower priority means earlier in the request pipeline.

use std::sync::atomic::{AtomicI64, Ordering};

/// Gate rejecting clients without a verified certificate on protected URLs.
pub const POSITION_CLIENT_CERT_GATE: i64 = -20_000;
pub const POSITION_COMPRESSION: i64 = -10_000;
pub const POSITION_COOKIE_PARSER: i64 = -150;
pub const POSITION_SESSION: i64 = -120;
pub const POSITION_TOKENIFY: i64 = -117;
pub const POSITION_TRACELOG_LISTENER: i64 = -115;
pub const POSITION_TRACELOG_BOUNDARY: i64 = -114;
pub const POSITION_PROXIFY: i64 = -113;
pub const POSITION_BODY_PARSER: i64 = -100;
pub const POSITION_METHOD_OVERRIDE: i64 = -98;
pub const POSITION_CSRF: i64 = -97;
pub const POSITION_HELMET: i64 = -96;

pub const POSITION_UNRESTRICTED_BEGIN: i64 = -50;
pub const POSITION_UNRESTRICTED_END: i64 = -10;

pub const POSITION_AUTHENTICATION: i64 = -1;

pub const POSITION_BEGIN_MIDDLEWARE: i64 = 0;
pub const POSITION_END_MIDDLEWARE: i64 = 10_000;

/// The open bands collaborators can allocate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// Between compression and cookie parsing.
    StaticFiles,
    /// After the framework slots, before authentication.
    Unrestricted,
    /// The general band for plugin-contributed handlers.
    Middlewares,
    /// After every ordinary contributor. Unbounded above.
    AfterMiddlewares,
}

impl Band {
    pub const ALL: [Band; 4] = [
        Band::StaticFiles,
        Band::Unrestricted,
        Band::Middlewares,
        Band::AfterMiddlewares,
    ];

    fn index(self) -> usize {
        match self {
            Band::StaticFiles => 0,
            Band::Unrestricted => 1,
            Band::Middlewares => 2,
            Band::AfterMiddlewares => 3,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Band::StaticFiles => "static-files",
            Band::Unrestricted => "unrestricted",
            Band::Middlewares => "middlewares",
            Band::AfterMiddlewares => "after-middlewares",
        };
        f.write_str(name)
    }
}

/// A contiguous priority range with its own allocation counter.
///
/// Invariant: `lower <= upper` when `upper` is bounded.
#[derive(Debug)]
pub struct PriorityBand {
    lower: i64,
    upper: Option<i64>,
    counter: AtomicI64,
}

impl PriorityBand {
    /// Create a band. An inverted range collapses to `lower..=lower`.
    pub fn new(lower: i64, upper: Option<i64>) -> Self {
        Self {
            lower,
            upper: upper.map(|u| u.max(lower)),
            counter: AtomicI64::new(0),
        }
    }

    pub fn lower(&self) -> i64 {
        self.lower
    }

    pub fn upper(&self) -> Option<i64> {
        self.upper
    }

    /// Number of allocations made so far.
    pub fn counter(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Allocate a priority inside this band.
    ///
    /// Every call advances the counter, including calls with an explicit
    /// priority. Without one, the candidate is `lower + counter`.
    pub fn allocate(&self, explicit: Option<i64>) -> i64 {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let candidate = explicit.unwrap_or_else(|| self.lower.saturating_add(counter));
        self.clamp(candidate)
    }

    /// Clamp `value` into `[lower, upper]`; only the lower bound applies to
    /// unbounded bands.
    pub fn clamp(&self, value: i64) -> i64 {
        let value = value.max(self.lower);
        match self.upper {
            Some(upper) => value.min(upper),
            None => value,
        }
    }

    /// Whether `value` lies inside the band.
    pub fn contains(&self, value: i64) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value <= upper)
    }
}

/// Per-server priority allocator.
///
/// Each server owns one instance and shares it with collaborators during
/// setup; counters are atomic so the handle may be cloned across tasks.
#[derive(Debug)]
pub struct PositionAllocator {
    bands: [PriorityBand; 4],
}

impl PositionAllocator {
    pub fn new() -> Self {
        Self {
            bands: [
                PriorityBand::new(POSITION_COMPRESSION + 1, Some(POSITION_COOKIE_PARSER - 1)),
                PriorityBand::new(POSITION_UNRESTRICTED_BEGIN, Some(POSITION_UNRESTRICTED_END)),
                PriorityBand::new(POSITION_BEGIN_MIDDLEWARE, Some(POSITION_END_MIDDLEWARE)),
                PriorityBand::new(POSITION_END_MIDDLEWARE + 1, None),
            ],
        }
    }

    pub fn band(&self, band: Band) -> &PriorityBand {
        &self.bands[band.index()]
    }

    /// Allocate a priority in `band`, optionally starting from `explicit`.
    pub fn allocate(&self, band: Band, explicit: Option<i64>) -> i64 {
        let priority = self.band(band).allocate(explicit);
        tracing::trace!(band = %band, ?explicit, priority, "Priority allocated");
        priority
    }

    pub fn in_range_of_static_files(&self, explicit: Option<i64>) -> i64 {
        self.allocate(Band::StaticFiles, explicit)
    }

    pub fn in_range_of_unrestricted(&self, explicit: Option<i64>) -> i64 {
        self.allocate(Band::Unrestricted, explicit)
    }

    pub fn in_range_of_middlewares(&self, explicit: Option<i64>) -> i64 {
        self.allocate(Band::Middlewares, explicit)
    }

    pub fn after_middlewares(&self, explicit: Option<i64>) -> i64 {
        self.allocate(Band::AfterMiddlewares, explicit)
    }
}

impl Default for PositionAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reserved_slots_are_ascending() {
        let slots = [
            POSITION_CLIENT_CERT_GATE,
            POSITION_COMPRESSION,
            POSITION_COOKIE_PARSER,
            POSITION_SESSION,
            POSITION_BODY_PARSER,
            POSITION_METHOD_OVERRIDE,
            POSITION_CSRF,
            POSITION_HELMET,
        ];
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn static_band_sits_between_compression_and_cookies() {
        let positions = PositionAllocator::new();
        let band = positions.band(Band::StaticFiles);
        assert_eq!(band.lower(), -9_999);
        assert_eq!(band.upper(), Some(-151));
    }

    #[test]
    fn default_allocations_count_up_from_lower_bound() {
        let positions = PositionAllocator::new();
        assert_eq!(positions.in_range_of_middlewares(None), 1);
        assert_eq!(positions.in_range_of_middlewares(None), 2);
        assert_eq!(positions.in_range_of_middlewares(None), 3);
        assert_eq!(positions.in_range_of_static_files(None), -9_998);
    }

    #[test]
    fn explicit_priority_is_clamped_and_advances_counter() {
        let positions = PositionAllocator::new();
        assert_eq!(positions.in_range_of_middlewares(Some(-5)), 0);
        assert_eq!(positions.in_range_of_middlewares(Some(20_000)), 10_000);
        assert_eq!(positions.in_range_of_middlewares(Some(42)), 42);
        assert_eq!(positions.band(Band::Middlewares).counter(), 3);
        assert_eq!(positions.in_range_of_middlewares(None), 4);
    }

    #[test]
    fn bounded_band_saturates_at_upper() {
        let positions = PositionAllocator::new();
        let last = (0..100).map(|_| positions.in_range_of_unrestricted(None)).last();
        assert_eq!(last, Some(POSITION_UNRESTRICTED_END));
    }

    #[test]
    fn post_band_never_clamps_downward() {
        let positions = PositionAllocator::new();
        assert_eq!(positions.after_middlewares(None), 10_002);
        assert_eq!(positions.after_middlewares(Some(i64::MAX)), i64::MAX);
        assert_eq!(positions.after_middlewares(Some(0)), 10_001);
    }

    #[test]
    fn allocators_do_not_share_counters() {
        let a = PositionAllocator::new();
        let b = PositionAllocator::new();
        a.in_range_of_middlewares(None);
        a.in_range_of_middlewares(None);
        assert_eq!(b.in_range_of_middlewares(None), 1);
    }

    fn any_band() -> impl Strategy<Value = Band> {
        prop::sample::select(Band::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn default_allocations_stay_in_band_and_never_decrease(band in any_band(), n in 1usize..300) {
            let positions = PositionAllocator::new();
            let mut previous = i64::MIN;
            for _ in 0..n {
                let priority = positions.allocate(band, None);
                prop_assert!(positions.band(band).contains(priority));
                prop_assert!(priority >= previous);
                previous = priority;
            }
        }

        #[test]
        fn explicit_allocation_equals_clamp(band in any_band(), requested in any::<i64>(), warmup in 0usize..20) {
            let positions = PositionAllocator::new();
            for _ in 0..warmup {
                positions.allocate(band, None);
            }
            let b = positions.band(band);
            let expected = match b.upper() {
                Some(upper) => requested.clamp(b.lower(), upper),
                None => requested.max(b.lower()),
            };
            prop_assert_eq!(positions.allocate(band, Some(requested)), expected);
        }
    }
}
