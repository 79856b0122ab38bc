//! Synthetic frames for tests
//!
//! Deterministic noise from a linear congruential generator, plus helpers
//! to paint rectangles and discs into row-major 8-bit buffers.

/// Linear congruential generator (Knuth's MMIX constants)
#[derive(Debug, Clone)]
pub struct Lcg(u64);

impl Lcg {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self(seed ^ 0x5DEE_CE66_D1CE_4E5B)
    }

    /// Next 32 random bits
    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 32) as u32
    }

    /// Uniform value in `0..bound` (`bound > 0`)
    pub fn next_below(&mut self, bound: u32) -> u32 {
        ((self.next_u32() as u64 * bound as u64) >> 32) as u32
    }
}

/// Binary mask where each pixel is 1 with roughly `percent`% probability
pub fn noise_mask(width: u32, height: u32, percent: u32, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    (0..width as usize * height as usize)
        .map(|_| (rng.next_below(100) < percent) as u8)
        .collect()
}

/// Gray buffer of `base` plus uniform noise in `0..=amplitude`
pub fn noisy_gray(width: u32, height: u32, base: u8, amplitude: u8, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    (0..width as usize * height as usize)
        .map(|_| base.saturating_add(rng.next_below(amplitude as u32 + 1) as u8))
        .collect()
}

/// Fill the rectangle `[x, x + w) x [y, y + h)` of a single-channel buffer,
/// clipped to the buffer
pub fn paint_rect(data: &mut [u8], width: u32, x: u32, y: u32, w: u32, h: u32, value: u8) {
    let height = data.len() as u32 / width.max(1);
    for row in y..(y + h).min(height) {
        let start = (row * width) as usize;
        let from = start + x.min(width) as usize;
        let to = start + (x + w).min(width) as usize;
        data[from..to].fill(value);
    }
}

/// Fill a disc of radius `r` around `(cx, cy)` of a single-channel buffer
pub fn paint_disc(data: &mut [u8], width: u32, cx: i32, cy: i32, r: i32, value: u8) {
    let height = (data.len() as u32 / width.max(1)) as i32;
    for y in (cy - r).max(0)..(cy + r + 1).min(height) {
        for x in (cx - r).max(0)..(cx + r + 1).min(width as i32) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                data[(y as u32 * width + x as u32) as usize] = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_is_deterministic() {
        let a: Vec<u32> = {
            let mut rng = Lcg::new(7);
            (0..8).map(|_| rng.next_u32()).collect()
        };
        let mut rng = Lcg::new(7);
        let b: Vec<u32> = (0..8).map(|_| rng.next_u32()).collect();
        assert_eq!(a, b);
        assert!((0..100).all(|_| rng.next_below(10) < 10));
    }

    #[test]
    fn test_noise_density() {
        let mask = noise_mask(100, 100, 30, 1);
        let set = mask.iter().filter(|&&v| v == 1).count();
        assert!((2500..3500).contains(&set));
    }

    #[test]
    fn test_paint_rect_clips() {
        let mut data = vec![0u8; 4 * 3];
        paint_rect(&mut data, 4, 2, 1, 5, 5, 9);
        assert_eq!(data, vec![0, 0, 0, 0, 0, 0, 9, 9, 0, 0, 9, 9]);
    }

    #[test]
    fn test_paint_disc() {
        let mut data = vec![0u8; 5 * 5];
        paint_disc(&mut data, 5, 2, 2, 1, 1);
        assert_eq!(data.iter().filter(|&&v| v == 1).count(), 5);
    }
}
