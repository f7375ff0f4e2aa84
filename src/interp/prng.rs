//! RC4 keystream generator behind `rand`, `rand()` and `srand()`.

pub struct Prng {
    sbox: [u8; 256],
    i: u8,
    j: u8,
}

impl Prng {
    /// Key schedule: swaps driven by the seed bytes, then the first 256
    /// bytes of keystream are thrown away.
    pub fn new(seed: &[u8]) -> Prng {
        let mut sbox = [0u8; 256];
        for (i, b) in sbox.iter_mut().enumerate() {
            *b = i as u8;
        }
        for (i, &s) in seed.iter().enumerate() {
            sbox.swap(i & 0xFF, s as usize);
        }
        let mut prng = Prng { sbox, i: 0, j: 0 };
        let mut discard = [0u8; 256];
        prng.fill(&mut discard);
        prng
    }

    pub fn from_u64(seed: u64) -> Prng {
        Prng::new(&seed.to_le_bytes())
    }

    pub fn fill(&mut self, out: &mut [u8]) {
        for b in out {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.sbox[self.i as usize]);
            self.sbox.swap(self.i as usize, self.j as usize);
            let k = self.sbox[self.i as usize].wrapping_add(self.sbox[self.j as usize]);
            *b = self.sbox[k as usize];
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_double(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[min, max)` by rejection sampling; `max == min` gives
    /// `min`. Callers check `max >= min`.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        let len = max.wrapping_sub(min);
        let limit = i64::MAX - if len > 0 { i64::MAX % len } else { 0 };
        loop {
            let r = (self.next_u64() >> 1) as i64;
            if r >= limit {
                continue;
            }
            return if len == 0 { min } else { min.wrapping_add(r % len) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Prng::from_u64(42);
        let mut b = Prng::from_u64(42);
        let mut c = Prng::from_u64(43);
        let xs: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
        let zs: Vec<u64> = (0..4).map(|_| c.next_u64()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn doubles_in_unit_interval() {
        let mut p = Prng::from_u64(7);
        for _ in 0..1000 {
            let d = p.next_double();
            assert!((0.0..1.0).contains(&d));
        }
    }

    #[test]
    fn range_bounds() {
        let mut p = Prng::from_u64(1);
        for _ in 0..1000 {
            let r = p.range(-3, 4);
            assert!((-3..4).contains(&r));
        }
        assert_eq!(p.range(5, 5), 5);
    }
}
