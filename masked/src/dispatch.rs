use msp_maybe_rayon::prelude::*;

/// Runs a pure kernel once for every index of an output buffer.
///
/// `execute` must call `kernel(i)` exactly once for each `i in 0..out.len()` and store the
/// result in `out[i]`. Units share no mutable state, so the order they run in is free.
pub trait Dispatch {
    fn execute<K>(&self, out: &mut [f32], kernel: K)
    where
        K: Fn(usize) -> f32 + Send + Sync;
}

impl<D: Dispatch + ?Sized> Dispatch for &D {
    fn execute<K>(&self, out: &mut [f32], kernel: K)
    where
        K: Fn(usize) -> f32 + Send + Sync,
    {
        (**self).execute(out, kernel);
    }
}

/// Runs every unit on the calling thread, in index order.
#[derive(Copy, Clone, Debug, Default)]
pub struct SerialDispatch;

impl Dispatch for SerialDispatch {
    fn execute<K>(&self, out: &mut [f32], kernel: K)
    where
        K: Fn(usize) -> f32 + Send + Sync,
    {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = kernel(i);
        }
    }
}

/// Splits the index range into groups of `group_len` units and runs the groups on the rayon
/// pool. Without the `parallel` feature the groups run one after another.
#[derive(Copy, Clone, Debug)]
pub struct ParallelDispatch {
    group_len: usize,
}

impl ParallelDispatch {
    pub const DEFAULT_GROUP_LEN: usize = 256;

    /// # Panics
    /// Panics if `group_len` is zero.
    pub const fn new(group_len: usize) -> Self {
        assert!(group_len > 0, "work groups must hold at least one unit");
        Self { group_len }
    }

    pub const fn group_len(&self) -> usize {
        self.group_len
    }
}

impl Default for ParallelDispatch {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GROUP_LEN)
    }
}

impl Dispatch for ParallelDispatch {
    fn execute<K>(&self, out: &mut [f32], kernel: K)
    where
        K: Fn(usize) -> f32 + Send + Sync,
    {
        let group_len = self.group_len;
        out.par_chunks_mut(group_len)
            .enumerate()
            .for_each(|(group, slots)| {
                let start = group * group_len;
                for (offset, slot) in slots.iter_mut().enumerate() {
                    *slot = kernel(start + offset);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    fn run<D: Dispatch>(dispatch: D, len: usize) -> Vec<f32> {
        let mut out = vec![-1.0; len];
        dispatch.execute(&mut out, |i| (i * i) as f32);
        out
    }

    #[test]
    fn test_every_index_is_written_once() {
        let expected: Vec<f32> = (0..1000).map(|i| (i * i) as f32).collect();
        assert_eq!(run(SerialDispatch, 1000), expected);
        assert_eq!(run(ParallelDispatch::default(), 1000), expected);
        assert_eq!(run(ParallelDispatch::new(1), 1000), expected);
        assert_eq!(run(ParallelDispatch::new(7), 1000), expected);
    }

    #[test]
    fn test_empty_range_runs_nothing() {
        assert!(run(SerialDispatch, 0).is_empty());
        assert!(run(&ParallelDispatch::new(3), 0).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_zero_group_len_panics() {
        let _ = ParallelDispatch::new(0);
    }
}
