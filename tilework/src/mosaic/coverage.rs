//! Bit-packed record of which output pixels have been written.

const BITS_PER_WORD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CoverageMask {
    words: Vec<u64>,
    width: usize,
    len: usize,
}

impl CoverageMask {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            words: vec![0; len.div_ceil(BITS_PER_WORD)],
            width,
            len,
        }
    }

    /// Marks the `width`x`height` rectangle at `(x, y)`. Caller checks bounds.
    pub fn mark_rect(&mut self, x: usize, y: usize, width: usize, height: usize) {
        for row in y..y + height {
            let start = row * self.width + x;
            self.mark_range(start, start + width);
        }
    }

    fn mark_range(&mut self, start: usize, end: usize) {
        debug_assert!(end <= self.len);
        let mut i = start;
        while i < end {
            let bit = i % BITS_PER_WORD;
            let n = (BITS_PER_WORD - bit).min(end - i);
            let mask = if n == BITS_PER_WORD {
                !0u64
            } else {
                ((1u64 << n) - 1) << bit
            };
            self.words[i / BITS_PER_WORD] |= mask;
            i += n;
        }
    }

    #[inline]
    pub fn is_marked(&self, x: usize, y: usize) -> bool {
        let i = y * self.width + x;
        self.words[i / BITS_PER_WORD] & (1u64 << (i % BITS_PER_WORD)) != 0
    }

    pub fn unmarked_count(&self) -> usize {
        let marked: usize = self.words.iter().map(|w| w.count_ones() as usize).sum();
        self.len - marked
    }
}
