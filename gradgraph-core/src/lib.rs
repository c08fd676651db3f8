//! # gradgraph-core
//!
//! Reverse-mode automatic differentiation over lazily evaluated, thread-safe
//! computation graphs of dense matrices.
//!
//! ```
//! use gradgraph_core::autograd::{backward, var_with_grad, DualValue};
//! use gradgraph_core::ops::add_op;
//! use gradgraph_core::Matrix;
//!
//! let x1 = var_with_grad(Matrix::scalar(1.0f64));
//! let x2 = var_with_grad(Matrix::scalar(2.0f64));
//! let y = add_op(&x1, &x2);
//! assert_eq!(*y.value().unwrap(), Matrix::scalar(3.0));
//!
//! backward(&y).unwrap();
//! assert_eq!(x1.grad().unwrap(), Some(Matrix::scalar(1.0)));
//! ```

pub mod autograd;
pub mod combinators;
pub mod mat;
pub mod ops;
pub mod utils;

pub mod error;
pub use error::GradGraphError;

pub use autograd::{DualValue, Node, NodeId, Operator, Variable};
pub use mat::{Element, Matrix, MatrixPool};
// Re-export traits required by public functions/structs
pub use num_traits;
