use alloc::vec::Vec;

/// An object whose length is written once its payload is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LengthFrame {
    /// Position of the header's first byte.
    pub header_at: usize,
    /// Header bytes written as a placeholder.
    pub reserved: usize,
}

impl LengthFrame {
    #[inline]
    pub fn payload_at(&self) -> usize {
        self.header_at + self.reserved
    }
}

/// Open frames, innermost last.
#[derive(Debug, Default)]
pub(crate) struct FrameStack(Vec<LengthFrame>);

impl FrameStack {
    #[inline]
    pub fn push(&mut self, frame: LengthFrame) {
        self.0.push(frame);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<LengthFrame> {
        self.0.pop()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Moves every frame recorded at or after `at` by `delta` bytes,
    /// after `delta` bytes were inserted at `at`.
    pub fn shift(&mut self, at: usize, delta: usize) {
        for frame in self.0.iter_mut().filter(|frame| frame.header_at >= at) {
            frame.header_at += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameStack, LengthFrame};

    #[test]
    fn shift_only_moves_later_frames() {
        let mut stack = FrameStack::default();
        stack.push(LengthFrame {
            header_at: 0,
            reserved: 1,
        });
        stack.push(LengthFrame {
            header_at: 10,
            reserved: 1,
        });

        stack.shift(5, 2);
        assert_eq!(stack.pop().map(|f| f.header_at), Some(12));
        assert_eq!(stack.pop().map(|f| f.payload_at()), Some(1));
        assert_eq!(stack.pop(), None);
    }
}
