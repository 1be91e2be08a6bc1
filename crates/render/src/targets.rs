use tracing::debug;

/// Bookkeeping for a demo's offscreen render targets.
///
/// Backends allocate one texture per slot at [`size`](TargetSet::size) and
/// rebuild them whenever [`generation`](TargetSet::generation) changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    count: u8,
    size: (u32, u32),
    generation: u64,
}

impl TargetSet {
    pub fn new(count: u8, width: u32, height: u32) -> Self {
        Self {
            count,
            size: (width.max(1), height.max(1)),
            generation: 0,
        }
    }

    /// Match the targets to a new viewport. Returns `true` when the old
    /// targets must be freed and reallocated.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return false;
        }
        debug!(
            from = ?self.size,
            to = ?size,
            targets = self.count,
            "reallocating render targets"
        );
        self.size = size;
        self.generation += 1;
        true
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_bumps_generation() {
        let mut t = TargetSet::new(2, 800, 600);
        assert_eq!(t.generation(), 0);
        assert!(t.resize(1024, 768));
        assert_eq!(t.size(), (1024, 768));
        assert_eq!(t.generation(), 1);
    }

    #[test]
    fn same_size_is_noop() {
        let mut t = TargetSet::new(2, 800, 600);
        assert!(!t.resize(800, 600));
        assert_eq!(t.generation(), 0);
    }

    #[test]
    fn zero_size_clamped() {
        let mut t = TargetSet::new(1, 0, 0);
        assert_eq!(t.size(), (1, 1));
        assert!(!t.resize(0, 0));
        assert!(t.resize(0, 5));
        assert_eq!(t.size(), (1, 5));
        assert_eq!(t.count(), 1);
    }
}
