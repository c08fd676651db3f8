//! # Automatic differentiation (`autograd`)
//!
//! Graph nodes implement [`DualValue`]: a value, an optional accumulated
//! gradient and a `requires_grad` flag. Leaves are [`Variable`]s; interior
//! nodes are [`Operator`]s wrapping a [`Function`] whose forward runs lazily,
//! at most once, on the first thread asking for the value.
//!
//! The reverse pass is driven by [`backward`] and its variants, which order
//! operators so that each one propagates only after every consumer has
//! contributed to its gradient. [`release_graph`] hands the buffers of a
//! finished graph back to the matrix pool, and [`TimeStepHandler`] tags
//! operators with a logical time step for truncated backpropagation.

pub mod backward;
pub mod function;
pub mod grad_check;
pub(crate) mod grad_cell;
pub(crate) mod graph;
pub mod node;
pub mod operator;
pub mod release;
pub mod time_step;
pub mod variable;

pub use backward::{backward, backward_many, backward_truncated, backward_with_grad};
pub use function::Function;
pub use grad_check::{check_grad, GradCheckError};
pub use node::{DualValue, Node, NodeId};
pub use operator::Operator;
pub use release::release_graph;
pub use time_step::{TimeStepHandler, TimeStepScope};
pub use variable::{scalar, var, var_with_grad, Variable};
