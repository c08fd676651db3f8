use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

/// Passes the value of `x` through unchanged and blocks gradient flow.
///
/// Downstream code sees a constant: the resulting operator never requires
/// gradients, so no backward pass reaches `x` through it.
#[derive(Debug)]
pub struct StopGrad<T: Element> {
    x: Node<T>,
}

impl<T: Element> StopGrad<T> {
    pub fn new(x: Node<T>) -> Self {
        StopGrad { x }
    }
}

impl<T: Element> Function<T> for StopGrad<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        Ok((*self.x.value()?).clone())
    }

    fn backward(&self, _grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        Ok(())
    }

    fn propagates_grad(&self) -> bool {
        false
    }
}

/// Returns a node with the value of `x` that gradients do not flow through.
pub fn stop_grad_op<T: Element>(x: &Node<T>) -> Node<T> {
    Operator::new(StopGrad::new(x.clone())).into_node()
}

#[cfg(test)]
#[path = "stop_grad_test.rs"]
mod tests;
