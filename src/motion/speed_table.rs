//! Step-rate to timer-interval conversion.
//!
//! Dividing the timer base by the step rate in tick context is too slow, so
//! the conversion runs through two piecewise-linear lookup tables generated
//! once from `f_cpu`: a fast table indexed by the high byte of the adjusted
//! rate for rates at or above 2048 Hz, and a slow table with 3-bit linear
//! interpolation below that. The tick path does no division and no floating
//! point.

use crate::config::TIMER_PRESCALE;

/// Hard floor on the timer compare value (50 us at the 2 MHz tick base).
pub const MIN_INTERVAL: u16 = 100;

const TABLE_LEN: usize = 256;

/// Adjusted rates at or above this use the fast table.
const FAST_THRESHOLD: u16 = 8 * 256;

/// Result of a rate lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateLookup {
    /// Timer compare value for the next tick.
    pub compare: u16,
    /// Event-multiplier shift: `1 << shift` Bresenham events per tick.
    pub shift: u8,
    /// The requested rate was clamped to stay inside timing limits.
    pub clamped: bool,
}

/// Speed-to-interval lookup tables.
///
/// Each entry is `[base, gain]`: the interval at the bucket start and the
/// scaled slope subtracted across the bucket.
pub struct SpeedTable {
    fast: [[u16; 2]; TABLE_LEN],
    slow: [[u16; 2]; TABLE_LEN],
    min_rate: u16,
    max_rate: u32,
}

impl SpeedTable {
    /// Generate the tables for a CPU clock and step-rate clamp.
    ///
    /// Call again if `f_cpu` changes; entries depend on the tick base.
    pub fn new(f_cpu: u32, max_step_frequency: u32) -> Self {
        let timer_hz = f_cpu / TIMER_PRESCALE;
        let min_rate = (f_cpu / 500_000) as u16;
        // Interval for an adjusted rate, before interpolation.
        let interval = |adjusted: u32| -> u16 {
            (timer_hz / (adjusted + min_rate as u32)).min(u16::MAX as u32) as u16
        };

        let mut fast = [[0u16; 2]; TABLE_LEN];
        let mut slow = [[0u16; 2]; TABLE_LEN];
        for i in 0..TABLE_LEN {
            let base = interval((i as u32) << 8);
            let next = interval((i as u32 + 1) << 8);
            // Fast gain is scaled by 256 so the interpolation is a 16-bit
            // multiply and shift. Buckets below FAST_THRESHOLD are never
            // indexed; their gain may saturate.
            let gain = (((base - next) as u32) << 8).min(u16::MAX as u32) as u16;
            fast[i] = [base, gain];

            let sbase = interval((i as u32) << 3);
            let snext = interval((i as u32 + 1) << 3);
            slow[i] = [sbase, sbase - snext];
        }

        Self {
            fast,
            slow,
            min_rate,
            max_rate: max_step_frequency,
        }
    }

    /// Map a step frequency (Hz) to a timer compare value and event
    /// multiplier.
    ///
    /// Above 10 kHz the interval is computed for half the rate with two
    /// events per tick, above 20 kHz for a quarter with four, so emitted
    /// events per second are preserved.
    pub fn lookup(&self, step_rate: u32) -> RateLookup {
        let mut clamped = step_rate > self.max_rate;
        let rate = step_rate.min(self.max_rate);

        let (rate, shift) = if rate > 20_000 {
            (rate >> 2, 2)
        } else if rate > 10_000 {
            (rate >> 1, 1)
        } else {
            (rate, 0)
        };

        // Normalize against the minimum representable speed.
        let rate = (rate.min(u16::MAX as u32) as u16).max(self.min_rate) - self.min_rate;

        let compare = if rate >= FAST_THRESHOLD {
            let [base, gain] = self.fast[(rate >> 8) as usize];
            base - ((((rate & 0xff) as u32 * gain as u32) >> 16) as u16)
        } else {
            let [base, gain] = self.slow[(rate >> 3) as usize];
            base - (((gain as u32 * (rate & 0x07) as u32) >> 3) as u16)
        };

        let compare = if compare < MIN_INTERVAL {
            clamped = true;
            MIN_INTERVAL
        } else {
            compare
        };

        RateLookup {
            compare,
            shift,
            clamped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SpeedTable {
        SpeedTable::new(16_000_000, 40_000)
    }

    #[test]
    fn minimum_speed_maps_to_longest_interval() {
        let t = table();
        // 32 Hz is the floor at 16 MHz; 2_000_000 / 32 = 62_500 ticks.
        let lk = t.lookup(32);
        assert_eq!(lk.compare, 62_500);
        assert_eq!(lk.shift, 0);
        assert!(!lk.clamped);
        // Anything below the floor yields the same interval.
        assert_eq!(t.lookup(1).compare, 62_500);
    }

    #[test]
    fn intervals_are_monotone_in_rate() {
        let t = table();
        let mut last = u16::MAX;
        for rate in (32..10_000).step_by(7) {
            let lk = t.lookup(rate);
            assert!(
                lk.compare <= last,
                "interval grew at {} Hz: {} > {}",
                rate,
                lk.compare,
                last
            );
            last = lk.compare;
        }
    }

    #[test]
    fn products_track_the_tick_base() {
        let t = table();
        for rate in [100u32, 500, 1000, 2000, 2048, 4000, 8000, 9999] {
            let lk = t.lookup(rate);
            let product = lk.compare as u64 * rate as u64;
            let err = product.abs_diff(2_000_000);
            assert!(
                err <= 2_000_000 / 50,
                "{} Hz: compare {} product {}",
                rate,
                lk.compare,
                product
            );
        }
    }

    #[test]
    fn multiplier_brackets() {
        let t = table();
        assert_eq!(t.lookup(10_000).shift, 0);
        assert_eq!(t.lookup(10_001).shift, 1);
        assert_eq!(t.lookup(16_000).shift, 1);
        assert_eq!(t.lookup(20_001).shift, 2);
        assert_eq!(t.lookup(40_000).shift, 2);

        // 16 kHz halves the rate, so the interval matches 8 kHz exactly.
        assert_eq!(t.lookup(16_000).compare, t.lookup(8_000).compare);
    }

    #[test]
    fn over_rate_is_clamped_and_flagged() {
        let t = table();
        let lk = t.lookup(100_000);
        assert!(lk.clamped);
        assert_eq!(lk.compare, t.lookup(40_000).compare);
        assert!(lk.compare >= MIN_INTERVAL);
    }

    #[test]
    fn regenerates_for_other_clocks() {
        // 20 MHz: 2.5 MHz tick base, 40 Hz floor, same 62_500 tick ceiling.
        let t = SpeedTable::new(20_000_000, 40_000);
        assert_eq!(t.lookup(40).compare, 62_500);
        let lk = t.lookup(1000);
        let product = lk.compare as u64 * 1000;
        assert!(product.abs_diff(2_500_000) <= 2_500_000 / 50);
    }
}
