//! State engine and public draw API.
//!
//! Architecture:
//! 1. Eight state lanes (phase word, entangle word, floating-point state,
//!    last measurement) advanced by a fixed four-round mixing schedule
//! 2. A 128-byte refill buffer regenerated whole by each step and drained
//!    left-to-right by the draws
//! 3. A 16-slot floating-point pool with a rolling index and integer mixer,
//!    updated inside every measurement
//! 4. Host-entropy snapshots folded in at init and refreshed per call
//!
//! A single [`QuantumRng`] is strictly single-threaded: every draw takes the
//! state by exclusive mutable borrow, so two concurrent callers on one
//! instance are a compile error rather than a data race. Independent
//! instances on separate threads are fine and diverge by construction.
//!
//! No draw allocates or blocks. Dropping the state scrubs every field to
//! zero before the memory is released.

use serde::Serialize;
use tracing::{debug, trace};
use zeroize::Zeroize;

use crate::constants::{
    BUFFER_SIZE, ELECTRON_G, GOLDEN_RATIO, HEISENBERG, MIXING_ROUNDS, NUM_QUBITS, PAULI_X,
    PAULI_Y, PAULI_Z, POOL_SIZE, SCHRODINGER,
};
use crate::entropy;
use crate::error::QrngError;
use crate::mix::{hadamard_mix, splitmix64};
use crate::noise::{from_unit, hadamard_gate, phase_gate, quantum_noise, to_unit};

/// Quantum-inspired pseudo-random bit generator.
///
/// Not a CSPRNG: the mixing schedule is statistical, not cryptographic, and
/// the output must not be used for key material. Output is also intentionally
/// non-reproducible — every step folds in a fresh host-clock snapshot, so the
/// same seed produces a different stream on every run.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct QuantumRng {
    phase: [u64; NUM_QUBITS],
    entangle: [u64; NUM_QUBITS],
    quantum_state: [f64; NUM_QUBITS],
    last_measurement: [u64; NUM_QUBITS],
    buffer: [u8; BUFFER_SIZE],
    buffer_pos: usize,
    counter: u64,
    entropy_pool: [f64; POOL_SIZE],
    pool_mixer: u64,
    pool_index: usize,
    init_micros: u64,
    pid: u32,
    unique_id: u64,
    system_entropy: u64,
    runtime_entropy: u64,
}

impl QuantumRng {
    /// Create a generator, optionally keyed by a seed.
    ///
    /// The seed perturbs the initial lane derivation; it does not make the
    /// stream reproducible (host entropy is folded in regardless). `None`
    /// and an empty slice are equivalent: lanes are derived from host
    /// entropy and the lane index alone.
    ///
    /// The constructor runs the full 8-step warm-up, so the first draw
    /// already reflects a fully mixed state.
    pub fn new(seed: Option<&[u8]>) -> Self {
        let seed = seed.filter(|s| !s.is_empty());

        let system_entropy = entropy::system_entropy();
        let unique_id = splitmix64(system_entropy);

        let mut rng = Self {
            phase: [0; NUM_QUBITS],
            entangle: [0; NUM_QUBITS],
            quantum_state: [0.0; NUM_QUBITS],
            last_measurement: [0; NUM_QUBITS],
            buffer: [0; BUFFER_SIZE],
            buffer_pos: 0,
            counter: 0,
            entropy_pool: [0.0; POOL_SIZE],
            pool_mixer: HEISENBERG ^ unique_id,
            pool_index: 0,
            init_micros: entropy::wall_clock_pair() & 0xFFFF_FFFF,
            // SAFETY: getpid() is a read-only syscall, always safe.
            pid: unsafe { libc::getpid() } as u32,
            unique_id,
            system_entropy,
            runtime_entropy: 0,
        };
        rng.refresh_runtime_entropy();

        for i in 0..POOL_SIZE {
            rng.entropy_pool[i] = quantum_noise(
                to_unit(system_entropy >> i)
                    + to_unit(rng.init_micros >> (i % 20))
                    + to_unit(u64::from(rng.pid) << (i % 16))
                    + to_unit(rng.runtime_entropy),
            );
        }

        let mut mixer = GOLDEN_RATIO ^ system_entropy;
        for i in 0..NUM_QUBITS {
            // With no seed the fold byte is 0 but the gate inputs fall back
            // to the lane index, so lanes still differentiate.
            let fold_byte = seed.map_or(0, |s| u64::from(s[i % s.len()]));
            let gate_byte = seed.map_or(i as u64, |s| u64::from(s[i % s.len()]));
            let reversed_byte = seed.map_or(i as u64, |s| {
                let idx = (s.len() as u64)
                    .wrapping_sub(1)
                    .wrapping_sub(i as u64)
                    % s.len() as u64;
                u64::from(s[idx as usize])
            });

            mixer = splitmix64(mixer ^ fold_byte ^ rng.runtime_entropy);

            rng.phase[i] = hadamard_gate(gate_byte ^ mixer ^ unique_id ^ rng.runtime_entropy);

            rng.quantum_state[i] = quantum_noise(
                to_unit(rng.phase[i] ^ system_entropy)
                    + rng.entropy_pool[i % POOL_SIZE]
                    + to_unit(rng.runtime_entropy),
            );

            let q = rng.quantum_state[i];
            rng.last_measurement[i] = rng.measure(q, reversed_byte);

            rng.entangle[i] = phase_gate(
                rng.last_measurement[i],
                gate_byte ^ mixer ^ rng.runtime_entropy,
            );
        }

        for _ in 0..(2 * MIXING_ROUNDS) {
            rng.step();
        }

        debug!(
            seeded = seed.is_some(),
            counter = rng.counter,
            "generator initialized"
        );
        rng
    }

    /// Fold a new seed into the existing state.
    ///
    /// Only the first [`NUM_QUBITS`] seed bytes reach the lanes; the rest of
    /// the seed still shapes the reversed-byte folds. Reruns the 8-step
    /// warm-up before returning.
    pub fn reseed(&mut self, seed: &[u8]) -> Result<(), QrngError> {
        if seed.is_empty() {
            return Err(QrngError::InvalidLength);
        }

        self.refresh_runtime_entropy();

        let mut mixer = GOLDEN_RATIO ^ self.runtime_entropy;
        for i in 0..seed.len().min(NUM_QUBITS) {
            mixer = splitmix64(mixer ^ u64::from(seed[i]) ^ self.runtime_entropy);

            self.phase[i] = hadamard_gate(
                self.phase[i] ^ u64::from(seed[i]) ^ mixer ^ self.runtime_entropy,
            );

            self.quantum_state[i] =
                quantum_noise(to_unit(self.phase[i]) + to_unit(self.runtime_entropy));

            let q = self.quantum_state[i];
            self.last_measurement[i] =
                self.measure(q, u64::from(seed[seed.len() - 1 - i]) ^ mixer);

            self.entangle[i] = phase_gate(
                self.last_measurement[i],
                u64::from(seed[i]) ^ mixer ^ self.runtime_entropy,
            );
        }

        for _ in 0..(2 * MIXING_ROUNDS) {
            self.step();
        }

        debug!(len = seed.len(), counter = self.counter, "generator reseeded");
        Ok(())
    }

    /// Fill `out` with generator bytes.
    ///
    /// Drains the refill buffer left-to-right, stepping the engine whenever
    /// it runs dry. Exactly `out.len()` bytes are written on success.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), QrngError> {
        if out.is_empty() {
            return Err(QrngError::InvalidLength);
        }
        self.drain(out);
        Ok(())
    }

    /// Draw a 64-bit word.
    ///
    /// Reads 8 buffer bytes (little-endian) and post-mixes them with a fresh
    /// runtime snapshot, so consecutive words differ even if the buffer ever
    /// repeated.
    pub fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.drain(&mut bytes);
        let mut result = u64::from_le_bytes(bytes);

        self.refresh_runtime_entropy();
        result = splitmix64(result ^ self.runtime_entropy);
        result ^= PAULI_X.wrapping_mul(result >> 27);
        result = result.wrapping_mul(HEISENBERG);
        result ^= PAULI_Y.wrapping_mul(result >> 31);
        result = result.wrapping_mul(SCHRODINGER);
        result ^= PAULI_Z.wrapping_mul(result >> 29);

        result
    }

    /// Draw a double in [0, 1) with a full 53-bit mantissa.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / 9007199254740992.0)
    }

    /// Draw a signed integer uniformly from the inclusive range [min, max].
    ///
    /// Total: `min > max` returns `max` instead of an error, and the
    /// full-domain request (`i32::MIN..=i32::MAX`, whose width wraps to 0)
    /// also returns `max`. The width is computed as
    /// `(max as u32) - (min as u32) + 1` in wrapping arithmetic, which keeps
    /// spans that cross zero at their true width. Uniformity comes from
    /// rejection sampling, not modulo alone.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if min > max {
            return max;
        }

        let range = (max as u32).wrapping_sub(min as u32).wrapping_add(1);
        if range == 0 {
            return max;
        }

        let threshold = range.wrapping_neg() % range;
        let mut r;
        loop {
            r = self.next_u64() as u32;
            if r >= threshold {
                break;
            }
        }

        min.wrapping_add((r % range) as i32)
    }

    /// Draw an unsigned 64-bit integer uniformly from [min, max].
    ///
    /// Total: `min > max` returns `max`, `min == max` returns `min`, and
    /// the full-domain request (width wraps to 0) returns `max`.
    pub fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        if min > max {
            return max;
        }
        if min == max {
            return min;
        }

        let range = max.wrapping_sub(min).wrapping_add(1);
        if range == 0 {
            return max;
        }

        let threshold = range.wrapping_neg() % range;
        let mut r;
        loop {
            r = self.next_u64();
            if r >= threshold {
                break;
            }
        }

        min.wrapping_add(r % range)
    }

    /// Pairwise mix of two caller-owned buffers.
    ///
    /// Both buffers are rewritten byte-for-byte from a shared per-index
    /// rotation word, leaving them correlated through it. The buffers must
    /// have the same non-zero length. This is a decorative transform driven
    /// by the mixing machinery, not a cryptographic operation.
    pub fn entangle_states(&mut self, a: &mut [u8], b: &mut [u8]) -> Result<(), QrngError> {
        if a.is_empty() || a.len() != b.len() {
            return Err(QrngError::InvalidLength);
        }

        self.refresh_runtime_entropy();

        let mut mixer = splitmix64(self.counter.wrapping_mul(GOLDEN_RATIO));
        for i in 0..a.len() {
            let s1 = hadamard_gate(u64::from(a[i]) ^ mixer ^ self.runtime_entropy);
            let s2 = hadamard_gate(u64::from(b[i]) ^ mixer ^ self.runtime_entropy);

            let phase = phase_gate(s1 ^ s2, self.counter ^ mixer ^ self.runtime_entropy);

            a[i] = (s1 ^ phase) as u8;
            b[i] = (s2 ^ phase) as u8;

            mixer = splitmix64(mixer ^ s1 ^ s2 ^ self.runtime_entropy);
        }

        for i in 0..NUM_QUBITS {
            self.quantum_state[i] =
                quantum_noise(self.quantum_state[i] + to_unit(self.runtime_entropy));
        }

        Ok(())
    }

    /// Collapse a caller-owned buffer byte-by-byte through the measurement
    /// path, then refresh every lane's last measurement.
    ///
    /// Like [`entangle_states`](Self::entangle_states), a decorative
    /// transform — not a cryptographic operation.
    pub fn measure_state(&mut self, state: &mut [u8]) -> Result<(), QrngError> {
        if state.is_empty() {
            return Err(QrngError::InvalidLength);
        }

        self.refresh_runtime_entropy();

        let mut mixer = splitmix64(self.counter.wrapping_mul(GOLDEN_RATIO));
        for i in 0..state.len() {
            let quantum_val =
                quantum_noise(f64::from(state[i]) / 255.0 + to_unit(self.runtime_entropy));

            let measured = self.measure(quantum_val, mixer);
            state[i] = (measured & 0xFF) as u8;

            mixer = splitmix64(mixer ^ measured ^ self.runtime_entropy);
        }

        for i in 0..NUM_QUBITS {
            let q = self.quantum_state[i];
            let last = self.last_measurement[i];
            self.last_measurement[i] = self.measure(q, last);
        }

        Ok(())
    }

    /// Heuristic pool-health metric.
    ///
    /// Averages `-log2(slot + 1e-10)` over the 16 pool slots plus the low
    /// byte of a fresh runtime snapshot. Not a Shannon entropy: a near-zero
    /// pool slot drives the average toward +33, which is the documented
    /// behavior, not a bug.
    pub fn entropy_estimate(&mut self) -> f64 {
        let mut entropy = 0.0;
        for slot in self.entropy_pool {
            entropy += -(slot + 1e-10).log2();
        }

        self.refresh_runtime_entropy();
        entropy += -((self.runtime_entropy & 0xFF) as f64 / 256.0 + 1e-10).log2();

        entropy / 17.0
    }

    /// Cheap observable snapshot of the generator's bookkeeping.
    pub fn diagnostics(&mut self) -> Diagnostics {
        Diagnostics {
            counter: self.counter,
            buffered: BUFFER_SIZE - self.buffer_pos.min(BUFFER_SIZE),
            pool_index: self.pool_index,
            entropy_estimate: self.entropy_estimate(),
        }
    }

    /// Infallible buffer drain shared by `fill`, `next_u64`, and `RngCore`.
    fn drain(&mut self, out: &mut [u8]) {
        let mut written = 0;
        while written < out.len() {
            if self.buffer_pos >= BUFFER_SIZE {
                self.step();
            }

            let n = (BUFFER_SIZE - self.buffer_pos).min(out.len() - written);
            out[written..written + n]
                .copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + n]);
            self.buffer_pos += n;
            written += n;
        }
    }

    fn refresh_runtime_entropy(&mut self) {
        self.runtime_entropy =
            entropy::runtime_entropy(self.system_entropy, self.unique_id, self.counter);
    }

    /// Measurement sub-step: collapse one lane value and feed the pool.
    ///
    /// Note the pool read in the mixer fold happens *after* the index
    /// advance, so it sees the next slot, not the one just written.
    fn measure(&mut self, quantum_state: f64, last: u64) -> u64 {
        self.refresh_runtime_entropy();

        let collapsed = quantum_noise(quantum_state + to_unit(self.runtime_entropy));

        self.entropy_pool[self.pool_index] = quantum_noise(
            self.entropy_pool[self.pool_index] + collapsed + to_unit(self.runtime_entropy),
        );
        self.pool_index = (self.pool_index + 1) & 0x0F;

        self.pool_mixer = hadamard_mix(
            self.pool_mixer ^ from_unit(self.entropy_pool[self.pool_index]) ^ self.runtime_entropy,
        );

        let mut result = hadamard_mix(
            from_unit(collapsed) ^ last.wrapping_mul(ELECTRON_G) ^ self.runtime_entropy,
        );

        result ^= PAULI_X.wrapping_mul(self.pool_mixer >> 29);
        result = result.wrapping_mul(HEISENBERG);
        result ^= PAULI_Y.wrapping_mul(result >> 31);
        result = result.wrapping_mul(SCHRODINGER);
        result ^= PAULI_Z.wrapping_mul(result >> 27);

        result
    }

    /// Advance the engine one step: four mixing rounds over all lanes, then
    /// regenerate the whole refill buffer.
    fn step(&mut self) {
        self.counter = self.counter.wrapping_add(1);
        let mut mixer = splitmix64(self.counter.wrapping_mul(GOLDEN_RATIO));

        self.refresh_runtime_entropy();

        for round in 0..MIXING_ROUNDS {
            mixer = hadamard_mix(mixer ^ self.pool_mixer ^ self.runtime_entropy);

            for i in 0..NUM_QUBITS {
                self.phase[i] = hadamard_gate(
                    self.counter
                        .wrapping_add(mixer)
                        .wrapping_add(i as u64)
                        .wrapping_add(round as u64)
                        .wrapping_add(self.runtime_entropy),
                );

                self.quantum_state[i] = quantum_noise(
                    to_unit(self.phase[i])
                        + self.entropy_pool[i & 0x0F]
                        + to_unit(self.runtime_entropy),
                );

                let q = self.quantum_state[i];
                let last = self.last_measurement[i];
                let measured = self.measure(q, last);

                self.entangle[i] =
                    phase_gate(measured, self.counter ^ mixer ^ self.runtime_entropy);
                self.last_measurement[i] = measured;

                if i > 0 {
                    self.entangle[i] ^=
                        hadamard_mix(self.entangle[i - 1] ^ mixer ^ self.runtime_entropy);
                    self.quantum_state[i] = quantum_noise(
                        self.quantum_state[i]
                            + self.quantum_state[i - 1]
                            + to_unit(self.runtime_entropy),
                    );
                }

                mixer = splitmix64(mixer ^ measured ^ self.pool_mixer ^ self.runtime_entropy);
            }
        }

        let mut prev = mixer;
        for i in 0..BUFFER_SIZE / 8 {
            let q = self.quantum_state[i % NUM_QUBITS];
            let e = self.entangle[i % NUM_QUBITS];
            let mut current = self.measure(q, e);

            current = hadamard_mix(current ^ prev ^ self.pool_mixer ^ self.runtime_entropy);
            current ^= PAULI_X.wrapping_mul(current >> 29);
            current = current.wrapping_mul(HEISENBERG);
            current ^= PAULI_Y.wrapping_mul(current >> 31);
            current = current.wrapping_mul(SCHRODINGER);

            self.buffer[i * 8..(i + 1) * 8].copy_from_slice(&current.to_le_bytes());
            prev = current;
        }
        self.buffer_pos = 0;

        trace!(counter = self.counter, "refill step");
    }
}

impl Default for QuantumRng {
    fn default() -> Self {
        Self::new(None)
    }
}

impl rand_core::RngCore for QuantumRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        QuantumRng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if !dest.is_empty() {
            self.drain(dest);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Observable bookkeeping snapshot, serializable for health endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    /// Completed refill steps since init (8 right after the warm-up).
    pub counter: u64,
    /// Unread bytes remaining in the refill buffer.
    pub buffered: usize,
    /// Current rolling entropy-pool slot.
    pub pool_index: usize,
    /// Heuristic pool-health metric; see
    /// [`entropy_estimate`](QuantumRng::entropy_estimate).
    pub entropy_estimate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_runs_eight_steps() {
        let mut rng = QuantumRng::new(None);
        assert_eq!(rng.counter, 8);
        assert_eq!(rng.buffer_pos, 0);
        // Fresh buffer: a full 128 bytes available before the next step.
        assert_eq!(rng.diagnostics().buffered, BUFFER_SIZE);
    }

    #[test]
    fn init_populates_every_lane() {
        let mut rng = QuantumRng::new(Some(b"lane population".as_slice()));
        // All-zero lanes after warm-up would mean the seed-apply never ran.
        assert!(rng.phase.iter().any(|&p| p != 0));
        assert!(rng.entangle.iter().any(|&e| e != 0));
        assert!(rng.last_measurement.iter().any(|&m| m != 0));
        for &q in &rng.quantum_state {
            assert!(q.is_finite());
            assert!((0.0..1.0).contains(&q), "lane state {q} outside [0,1)");
        }
        for &slot in &rng.entropy_pool {
            assert!(slot.is_finite());
            assert!((0.0..1.0).contains(&slot), "pool slot {slot} outside [0,1)");
        }
        let _ = rng.next_u64();
    }

    #[test]
    fn step_replaces_buffer_and_resets_position() {
        let mut rng = QuantumRng::new(None);
        let before = rng.buffer;
        rng.buffer_pos = 77;
        rng.step();
        assert_eq!(rng.buffer_pos, 0);
        assert_ne!(rng.buffer, before);
    }

    #[test]
    fn pool_index_stays_masked() {
        let mut rng = QuantumRng::new(None);
        for _ in 0..1000 {
            let _ = rng.next_u64();
            assert!(rng.pool_index < POOL_SIZE);
        }
    }

    #[test]
    fn lane_floats_stay_in_unit_interval_across_steps() {
        let mut rng = QuantumRng::new(Some(b"float invariants".as_slice()));
        for _ in 0..64 {
            rng.step();
            for &q in &rng.quantum_state {
                assert!((0.0..1.0).contains(&q));
            }
            for &slot in &rng.entropy_pool {
                assert!((0.0..1.0).contains(&slot));
            }
        }
    }

    #[test]
    fn drain_crosses_buffer_boundary() {
        let mut rng = QuantumRng::new(None);
        let mut out = [0u8; BUFFER_SIZE + 1];
        rng.fill(&mut out).unwrap();
        // One extra byte forces exactly one refill step.
        assert_eq!(rng.counter, 9);
        assert_eq!(rng.buffer_pos, 1);
    }

    #[test]
    fn buffer_words_are_little_endian() {
        let mut rng = QuantumRng::new(None);
        rng.step();
        let words = rng.buffer;
        let mut via_fill = [0u8; BUFFER_SIZE];
        rng.buffer_pos = 0;
        rng.drain(&mut via_fill);
        // The byte view served to callers is exactly the word view laid out
        // in little-endian order.
        assert_eq!(words, via_fill);
    }

    #[test]
    fn rngcore_matches_inherent_path() {
        use rand_core::RngCore;
        let mut rng = QuantumRng::new(None);
        // Both paths go through the same post-mix; just exercise them.
        let _ = RngCore::next_u64(&mut rng);
        let _ = rng.next_u32();
        let mut buf = [0u8; 40];
        rng.fill_bytes(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
        rng.try_fill_bytes(&mut buf).unwrap();
    }

    #[test]
    fn entropy_estimate_is_finite() {
        let mut rng = QuantumRng::new(None);
        let estimate = rng.entropy_estimate();
        assert!(estimate.is_finite());
        // With the +1e-10 guard a slot can contribute at most ~33.2 bits.
        assert!(estimate.abs() < 34.0);
    }

    #[test]
    fn diagnostics_reflect_consumption() {
        let mut rng = QuantumRng::new(None);
        let mut out = [0u8; 24];
        rng.fill(&mut out).unwrap();
        let d = rng.diagnostics();
        assert_eq!(d.counter, 8);
        assert_eq!(d.buffered, BUFFER_SIZE - 24);
        assert!(d.pool_index < POOL_SIZE);
    }
}
