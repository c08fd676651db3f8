pub mod sum;

pub use sum::{reduce_sum_op, ReduceSum};
