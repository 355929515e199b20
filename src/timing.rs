//! Minimum hold times between bus transitions.
//!
//! Every hook is a lower bound: the engine calls it at a fixed point of the
//! bit sequence and continues as soon as it returns. Nothing here yields to
//! a scheduler, so the holds stay short enough for bit timing.
//!
//! Three sources are provided:
//! - [`Spin`]: busy-wait iteration counts fixed at compile time
//!   ([`NoDelay`] is the all-zero form and the fastest the pins allow).
//! - [`DelayHolds`]: microsecond [`Holds`] applied through a blocking delay.
//! - [`Ticks`]: one tick of a periodic timer per clock half-period.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::timer::{CountDown, Periodic};
use nb::block;

/// Hold points of the bus engine.
///
/// All hooks default to no delay.
pub trait Timing {
    /// After the data line falls for a START, before the clock falls
    #[inline]
    fn start_hold(&mut self) {}

    /// After the clock rises for a STOP, before the data line rises
    #[inline]
    fn stop_hold(&mut self) {}

    /// Before every clock rise, so the pull-up can take effect
    #[inline]
    fn scl_low_hold(&mut self) {}

    /// After every clock rise, before the clock falls
    #[inline]
    fn scl_high_hold(&mut self) {}

    /// Extra clock-low time while the data line is an input
    #[inline]
    fn input_settle(&mut self) {}
}

/// Busy-wait holds with iteration counts fixed at compile time
#[derive(Debug, Default, Clone, Copy)]
pub struct Spin<
    const START: u32,
    const STOP: u32,
    const SCL_LOW: u32,
    const SCL_HIGH: u32,
    const SETTLE: u32,
>;

/// No hold at all
pub type NoDelay = Spin<0, 0, 0, 0, 0>;

#[inline(always)]
fn spin(iterations: u32) {
    for _ in 0..iterations {
        core::hint::spin_loop();
    }
}

impl<
        const START: u32,
        const STOP: u32,
        const SCL_LOW: u32,
        const SCL_HIGH: u32,
        const SETTLE: u32,
    > Timing for Spin<START, STOP, SCL_LOW, SCL_HIGH, SETTLE>
{
    #[inline(always)]
    fn start_hold(&mut self) {
        spin(START)
    }

    #[inline(always)]
    fn stop_hold(&mut self) {
        spin(STOP)
    }

    #[inline(always)]
    fn scl_low_hold(&mut self) {
        spin(SCL_LOW)
    }

    #[inline(always)]
    fn scl_high_hold(&mut self) {
        spin(SCL_HIGH)
    }

    #[inline(always)]
    fn input_settle(&mut self) {
        spin(SETTLE)
    }
}

/// Hold durations in microseconds, all zero by default
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Holds {
    /// START hold
    pub start: u32,
    /// STOP hold
    pub stop: u32,
    /// Clock low time before a rise
    pub scl_low: u32,
    /// Clock high time before a fall
    pub scl_high: u32,
    /// Extra clock low time with the data line as input
    pub input_settle: u32,
}

impl Holds {
    /// All holds zero
    pub const fn new() -> Self {
        Holds {
            start: 0,
            stop: 0,
            scl_low: 0,
            scl_high: 0,
            input_settle: 0,
        }
    }

    /// Same low and high time for a symmetric clock, start and stop holds
    /// equal to one half-period.
    pub const fn symmetric(half_period: u32) -> Self {
        Holds {
            start: half_period,
            stop: half_period,
            scl_low: half_period,
            scl_high: half_period,
            input_settle: 0,
        }
    }

    /// Set the START hold
    pub const fn start(mut self, us: u32) -> Self {
        self.start = us;
        self
    }

    /// Set the STOP hold
    pub const fn stop(mut self, us: u32) -> Self {
        self.stop = us;
        self
    }

    /// Set the clock low time
    pub const fn scl_low(mut self, us: u32) -> Self {
        self.scl_low = us;
        self
    }

    /// Set the clock high time
    pub const fn scl_high(mut self, us: u32) -> Self {
        self.scl_high = us;
        self
    }

    /// Set the extra settle time for the data line as input
    pub const fn input_settle(mut self, us: u32) -> Self {
        self.input_settle = us;
        self
    }
}

/// [`Holds`] applied through a blocking delay provider
pub struct DelayHolds<D> {
    delay: D,
    holds: Holds,
}

impl<D> DelayHolds<D>
where
    D: DelayUs<u32>,
{
    /// Create instance
    pub fn new(delay: D, holds: Holds) -> Self {
        DelayHolds { delay, holds }
    }

    /// Current hold durations
    pub fn holds(&self) -> Holds {
        self.holds
    }

    /// Give the delay provider back
    pub fn into_inner(self) -> D {
        self.delay
    }

    #[inline]
    fn hold(&mut self, us: u32) {
        if us != 0 {
            self.delay.delay_us(us);
        }
    }
}

impl<D> Timing for DelayHolds<D>
where
    D: DelayUs<u32>,
{
    fn start_hold(&mut self) {
        self.hold(self.holds.start)
    }

    fn stop_hold(&mut self) {
        self.hold(self.holds.stop)
    }

    fn scl_low_hold(&mut self) {
        self.hold(self.holds.scl_low)
    }

    fn scl_high_hold(&mut self) {
        self.hold(self.holds.scl_high)
    }

    fn input_settle(&mut self) {
        self.hold(self.holds.input_settle)
    }
}

/// Periodic timer pacing.
///
/// Configure the timer frequency to be twice the desired bus clock
/// frequency. The clock-low half-period usually covers the pull-up rise
/// time, so no extra settle tick is taken unless asked for with
/// [`Ticks::settle_ticks`].
pub struct Ticks<CLK>
where
    CLK: CountDown + Periodic,
{
    clk: CLK,
    settle_ticks: u32,
}

impl<CLK> Ticks<CLK>
where
    CLK: CountDown + Periodic,
{
    /// Create instance from a running periodic timer
    pub fn new(clk: CLK) -> Self {
        Ticks {
            clk,
            settle_ticks: 0,
        }
    }

    /// Extra ticks to wait while the data line is an input, for weak
    /// pull-ups
    pub fn settle_ticks(mut self, ticks: u32) -> Self {
        self.settle_ticks = ticks;
        self
    }

    /// Give the timer back
    pub fn into_inner(self) -> CLK {
        self.clk
    }

    #[inline]
    fn wait_for_clk(&mut self) {
        block!(self.clk.wait()).ok();
    }
}

impl<CLK> Timing for Ticks<CLK>
where
    CLK: CountDown + Periodic,
{
    fn start_hold(&mut self) {
        self.wait_for_clk()
    }

    fn stop_hold(&mut self) {
        self.wait_for_clk()
    }

    fn scl_low_hold(&mut self) {
        self.wait_for_clk()
    }

    fn scl_high_hold(&mut self) {
        self.wait_for_clk()
    }

    fn input_settle(&mut self) {
        for _ in 0..self.settle_ticks {
            self.wait_for_clk();
        }
    }
}
