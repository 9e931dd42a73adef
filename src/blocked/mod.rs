//! Cache-blocked multiplication.
//!
//! The block strategy tiles the index space so a working set of A, B and C
//! sub-blocks stays resident in a fast cache level. The block size is the
//! knob a sweep turns to find where the miss rate drops.

pub mod tiled;
