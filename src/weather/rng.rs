/// Mulberry32 pseudo-random generator.
///
/// All arithmetic is wrapping `u32`, so a given seed yields the same
/// sequence on every platform. Seeds wider than 32 bits are truncated
/// modulo 2^32 (negative seeds wrap).
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

const INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

impl SeededRng {
    pub fn new(seed: i64) -> Self {
        Self { state: seed as u32 }
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / TWO_POW_32
    }

    /// Uniform draw in `[min, max)`.
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}
