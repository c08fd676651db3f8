//! # Differentiable functions (`ops`)
//!
//! Each operation is a [`Function`](crate::autograd::Function) plug-in holding
//! its operands, plus an `xxx_op` builder that wraps it in an
//! [`Operator`](crate::autograd::Operator) and returns the new graph node.
//! Builders never fail: shape errors surface lazily from the node's
//! `value()` or from the backward pass.
//!
//! ## Key Submodules:
//!
//! - [`arithmetic`]: element-wise `add`, `sub`, `prod`, and scaling by a `1x1` node.
//! - [`linalg`]: matrix product.
//! - [`math_elem`]: `pow` and the unary element-wise functions (`exp`, `log`, `tanh`, `sigmoid`, `relu`).
//! - [`reduction`]: sum of all elements.
//! - [`view`]: element extraction.
//! - [`stop_grad`]: gradient barrier.

pub mod arithmetic;
pub mod linalg;
pub mod math_elem;
pub mod reduction;
pub mod stop_grad;
pub mod view;

pub use arithmetic::{add_op, div_scalar_op, prod_op, prod_scalar_op, sub_op};
pub use linalg::mat_mul_op;
pub use math_elem::{exp_op, log_op, pow_op, relu_op, sigmoid_op, tanh_op};
pub use reduction::reduce_sum_op;
pub use stop_grad::stop_grad_op;
pub use view::at_vec_op;
