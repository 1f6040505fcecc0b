//! Monotonic clock helpers for the traffic scheduler
//!
//! Everything time-related goes through `CLOCK_MONOTONIC` so deadlines and
//! latency stamps share one timebase that never jumps. The two wait
//! primitives land on the same absolute deadline; they differ only in CPU
//! cost and wake precision.

use nix::sys::time::TimeSpec;
use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Current monotonic time.
pub fn now() -> TimeSpec {
    clock_gettime(ClockId::CLOCK_MONOTONIC).expect("monotonic clock unavailable")
}

/// A duration of `ns` nanoseconds as a `TimeSpec` delta.
pub fn duration_from_nanos(ns: u64) -> TimeSpec {
    TimeSpec::new(
        (ns / NANOS_PER_SEC) as i64,
        (ns % NANOS_PER_SEC) as i64,
    )
}

/// Whole microseconds from `earlier` to `later`.
pub fn micros_between(later: TimeSpec, earlier: TimeSpec) -> u64 {
    let delta = later - earlier;
    (delta.tv_sec() as i64 * 1_000_000 + delta.tv_nsec() / 1_000).max(0) as u64
}

/// Burn CPU polling the clock until `deadline` is reached.
pub fn spin_until(deadline: TimeSpec) {
    while now() < deadline {
        std::hint::spin_loop();
    }
}

/// Block until the absolute `deadline`, resuming through signal interrupts.
pub fn sleep_until(deadline: TimeSpec) {
    loop {
        match clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::TIMER_ABSTIME,
            &deadline,
        ) {
            Ok(_) => return,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => panic!("clock_nanosleep failed: {e}"),
        }
    }
}
