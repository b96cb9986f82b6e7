//! Host entropy sampling.
//!
//! Two snapshots feed the generator: a one-shot system snapshot taken at
//! init, and a cheap runtime snapshot refreshed before every step and
//! measurement. Neither is a hardware entropy source in its own right — they
//! exist to make the output stream vary across calls and across processes.
//! A clock that cannot be read contributes zero instead of failing.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::mix::hadamard_mix;

// `libc` does not expose a binding for the POSIX `clock()` function on this
// target, so declare it directly.
extern "C" {
    fn clock() -> libc::clock_t;
}

/// Wall-clock pair: seconds in the high half, microseconds in the low half.
pub(crate) fn wall_clock_pair() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() << 32) | u64::from(now.subsec_micros())
}

/// One-shot system snapshot taken at init.
///
/// XOR-folds the wall clock, the process id shifted into the high half, a
/// CPU-local clock, the address of a stack local, and (on x86) the cycle
/// counter. Sources that do not exist on the host are simply omitted.
pub(crate) fn system_entropy() -> u64 {
    let probe = 0u64;

    let mut entropy = wall_clock_pair();
    // SAFETY: getpid() and clock() are read-only syscalls, always safe.
    entropy ^= (unsafe { libc::getpid() } as u64) << 32;
    entropy ^= unsafe { clock() } as u64;
    entropy ^= &probe as *const u64 as usize as u64;

    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: reading the time-stamp counter has no side effects.
        entropy ^= unsafe { core::arch::x86_64::_rdtsc() };
    }

    entropy
}

/// Per-call runtime snapshot.
///
/// Folds the wall clock with the init-time identifiers and the step counter,
/// then avalanches the result. This is the sole source of per-call
/// non-reproducibility in the generator.
pub(crate) fn runtime_entropy(system_entropy: u64, unique_id: u64, counter: u64) -> u64 {
    hadamard_mix(wall_clock_pair() ^ system_entropy ^ unique_id ^ counter)
}
