use crate::autograd::node::Node;
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};
use std::fmt::Debug;

/// A differentiable function plugged into an [`Operator`](crate::autograd::Operator).
///
/// The function owns handles to its operands. The engine never inspects the
/// concrete type: graph edges are discovered through [`operands`](Self::operands),
/// values through [`forward`](Self::forward) and gradients flow through
/// [`backward`](Self::backward).
///
/// The trait requires `Debug + Send + Sync` because operators are shared
/// between threads during concurrent evaluation.
pub trait Function<T: Element>: Debug + Send + Sync {
    /// The nodes this function reads. Order is the function's own concern.
    fn operands(&self) -> Vec<Node<T>>;

    /// Computes the output from the operands' current values.
    ///
    /// Called at most once per operator.
    fn forward(&self) -> Result<Matrix<T>, GradGraphError>;

    /// Propagates `grad_output` (dL/dOutput) into the operands that require
    /// gradients, through their [`acc_grad`](crate::autograd::DualValue::acc_grad).
    ///
    /// # Errors
    /// A shape mismatch between `grad_output` and what the function produced
    /// or expects must be reported, not panicked on.
    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError>;

    /// Whether gradients flow through this function at all.
    ///
    /// A function returning `false` makes its operator report
    /// `requires_grad() == false` whatever its operands are, so the backward
    /// pass never reaches past it. Its operands stay visible to graph release.
    fn propagates_grad(&self) -> bool {
        true
    }
}
