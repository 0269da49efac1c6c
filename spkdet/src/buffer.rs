/// Accumulates fixed-width feature vectors across utterances.
///
/// Width is fixed at construction; pushing a frame of any other width is
/// a caller bug and panics.
#[derive(Debug, Clone)]
pub struct FeatureBuffer {
    dim: usize,
    frames: Vec<Vec<f32>>,
}

impl FeatureBuffer {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "feature width must be positive");
        Self {
            dim,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: Vec<f32>) {
        assert_eq!(frame.len(), self.dim, "feature width mismatch");
        self.frames.push(frame);
    }

    pub fn extend<I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        for frame in frames {
            self.push(frame);
        }
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_clear() {
        let mut buf = FeatureBuffer::new(3);
        assert!(buf.is_empty());
        buf.push(vec![1.0, 2.0, 3.0]);
        buf.extend(vec![vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.frames()[1], vec![4.0, 5.0, 6.0]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.dim(), 3);
    }

    #[test]
    #[should_panic(expected = "feature width mismatch")]
    fn test_wrong_width_panics() {
        let mut buf = FeatureBuffer::new(3);
        buf.push(vec![1.0, 2.0]);
    }
}
