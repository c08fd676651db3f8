pub mod at;

pub use at::{at_vec_op, AtVec};
