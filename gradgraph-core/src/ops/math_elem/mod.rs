pub mod pow;
pub mod unary;

pub use pow::{pow_op, Pow};
pub use unary::{exp_op, log_op, relu_op, sigmoid_op, tanh_op, UnaryElementwise, UnaryKind};
