//! Parallel iteration that degrades to plain iteration.
//!
//! With the `parallel` feature the prelude is rayon's; without it the same method names resolve
//! to serial `core` iterators, so callers write `par_*` code once and pick the backend with a
//! cargo feature.

#[cfg(feature = "parallel")]
pub mod prelude {
    pub use rayon::current_num_threads;
    pub use rayon::prelude::*;
}

#[cfg(not(feature = "parallel"))]
mod serial;

#[cfg(not(feature = "parallel"))]
pub mod prelude {
    pub use core::iter::{
        ExactSizeIterator as IndexedParallelIterator, Iterator as ParallelIterator,
    };

    pub use super::serial::*;
}
