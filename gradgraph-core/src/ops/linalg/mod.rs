pub mod matmul;

pub use matmul::{mat_mul_op, MatMul};
