// ECG Edge: Sample Buffer
//
// Fixed-capacity window of filtered samples. Storage is allocated once at
// construction; `push` and `clear` never allocate.

#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Box<[f32]>,
    len: usize,
}

impl SampleBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Append a sample. Returns `false` (and drops the sample) when full.
    #[must_use]
    pub fn push(&mut self, sample: f32) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.len] = sample;
        self.len += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.len == self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The samples stored so far, oldest first.
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_refuses() {
        let mut buf = SampleBuffer::with_capacity(3);
        assert!(buf.is_empty());
        assert!(buf.push(1.0));
        assert!(buf.push(2.0));
        assert!(!buf.is_full());
        assert!(buf.push(3.0));
        assert!(buf.is_full());

        assert!(!buf.push(4.0));
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn clear_restarts_the_window() {
        let mut buf = SampleBuffer::with_capacity(2);
        assert!(buf.push(1.0));
        assert!(buf.push(2.0));
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 2);
        assert!(buf.push(9.0));
        assert_eq!(buf.as_slice(), &[9.0]);
    }
}
