//! Pipeline step implementations.
//!
//! Each step handles one stage of the merge: normalize, concat, mux.

mod concat;
mod mux;
mod normalize;

pub use concat::ConcatStep;
pub use mux::MuxStep;
pub use normalize::NormalizeStep;
