//! Fixed-capacity circular buffer of analysis-rate samples (C3).
//!
//! Single writer (the audio thread, via [`RingBuffer::write`]), single
//! reader (the worker thread, via the snapshot taken by
//! [`RingBuffer::copy_into`]). The reader never races the writer: the
//! snapshot is taken by the audio thread itself, under the busy-flag
//! handshake in `dsp::worker`, before the worker is woken.

/// Circular buffer of `capacity` analysis-rate samples.
pub struct RingBuffer {
    buffer: Vec<f32>,
    /// Index of the next position to be written (one past the most recent sample).
    write_index: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_index = 0;
    }

    /// Write `samples` starting at the current write cursor, wrapping modulo
    /// capacity. Mirrors the resampler's output-draining loop: callers keep
    /// calling this with whatever the resampler produced until its input is
    /// exhausted.
    pub fn write(&mut self, samples: &[f32]) {
        let capacity = self.buffer.len();
        let mut written = 0;
        while written < samples.len() {
            let space = capacity - self.write_index;
            let n = space.min(samples.len() - written);
            self.buffer[self.write_index..self.write_index + n]
                .copy_from_slice(&samples[written..written + n]);
            self.write_index = (self.write_index + n) % capacity;
            written += n;
        }
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Copy the most recent `window` samples (ending at the current write
    /// cursor) into `out`, unwrapping the modulo boundary. `out.len()` must
    /// equal `window`.
    pub fn copy_into(&self, window: usize, out: &mut [f32]) {
        debug_assert_eq!(out.len(), window);
        let capacity = self.buffer.len();
        let start = (capacity + self.write_index - window) % capacity;
        let end = self.write_index;
        if start >= end {
            let head_len = capacity - start;
            out[..head_len].copy_from_slice(&self.buffer[start..]);
            out[head_len..].copy_from_slice(&self.buffer[..end]);
        } else {
            out.copy_from_slice(&self.buffer[start..end]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_copy_round_trips_without_wrap() {
        let mut rb = RingBuffer::new(8);
        rb.write(&[1.0, 2.0, 3.0]);
        let mut out = vec![0.0; 3];
        rb.copy_into(3, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn copy_unwraps_modulo_boundary() {
        let mut rb = RingBuffer::new(4);
        rb.write(&[1.0, 2.0, 3.0, 4.0]);
        // write_index has wrapped back to 0; write 2 more to push it partway.
        rb.write(&[5.0, 6.0]);
        // buffer contents: [5, 6, 3, 4], write_index = 2
        let mut out = vec![0.0; 4];
        rb.copy_into(4, &mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn reset_clears_contents_and_cursor() {
        let mut rb = RingBuffer::new(4);
        rb.write(&[1.0, 2.0, 3.0, 4.0]);
        rb.reset();
        assert_eq!(rb.write_index(), 0);
        let mut out = vec![0.0; 4];
        rb.copy_into(4, &mut out);
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn write_larger_than_capacity_in_one_call_wraps_correctly() {
        let mut rb = RingBuffer::new(4);
        rb.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // only the last 4 samples [3,4,5,6] should remain, cursor at 2
        let mut out = vec![0.0; 4];
        rb.copy_into(4, &mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }
}
