//! # qrng-core
//!
//! **A quantum-inspired pseudo-random bit generator.**
//!
//! `qrng-core` is the core generator library: a small-state mixing engine
//! that dresses a SplitMix-style avalanche, a Pauli-keyed cascade, and a
//! trigonometric noise map in quantum vocabulary, and serves typed draws
//! from a 128-byte refill buffer.
//!
//! ## Quick Start
//!
//! ```
//! use qrng_core::QuantumRng;
//!
//! let mut rng = QuantumRng::new(Some(b"example seed".as_slice()));
//!
//! let word = rng.next_u64();
//! let unit = rng.next_f64();        // [0, 1)
//! let roll = rng.range_i32(1, 6);   // inclusive bounds
//!
//! let mut buf = [0u8; 32];
//! rng.fill(&mut buf).unwrap();
//!
//! assert!((0.0..1.0).contains(&unit));
//! assert!((1..=6).contains(&roll));
//! # let _ = word;
//! ```
//!
//! ## Architecture
//!
//! Scalar mixers → noise maps → state engine → typed draws
//!
//! - [`mix`]: two pure 64-bit avalanche functions
//! - [`noise`]: floating-point noise maps and the gates built on them
//! - [`generator`]: the state engine — eight lanes, a 16-slot entropy pool,
//!   the refill buffer, and the public draw API
//!
//! ## What this is not
//!
//! **Not a CSPRNG.** The construction is a statistical mixing engine; nothing
//! about it resists prediction by an adversary, and it must never be used for
//! key material or any other security purpose.
//!
//! **Not reproducible.** Every refill step folds in a fresh host-clock
//! snapshot, so a fixed seed does not produce a fixed stream. Seeding shapes
//! the state; the host keeps it drifting. Tests against this crate assert
//! distribution properties, never exact bytes.
//!
//! **Not actual quantum mechanics.** The vocabulary (lanes as "qubits",
//! "entanglement", "measurement") names the mixing stages, nothing more.

pub mod constants;
mod entropy;
pub mod error;
pub mod generator;
pub mod mix;
pub mod noise;

pub use error::{QrngError, error_string};
pub use generator::{Diagnostics, QuantumRng};
pub use mix::{hadamard_mix, splitmix64};
pub use noise::{hadamard_gate, phase_gate, quantum_noise};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string in `major.minor.patch` form. No side effects.
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_semver_shaped() {
        let v = super::version();
        assert_eq!(v.split('.').count(), 3);
        for part in v.split('.') {
            part.parse::<u32>().expect("numeric version component");
        }
    }
}
