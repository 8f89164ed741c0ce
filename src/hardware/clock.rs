use std::time::Instant;

/// Emulated FPGA timestamp: microseconds since construction, wrapping at 32 bits.
#[derive(Debug, Clone, Copy)]
pub struct FpgaClock {
    start: Instant,
}

impl FpgaClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u32 {
        // Truncation is the wrap of the hardware counter.
        self.start.elapsed().as_micros() as u32
    }
}

impl Default for FpgaClock {
    fn default() -> Self {
        Self::new()
    }
}
