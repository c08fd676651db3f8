use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Sum of all elements of `x`, as a `1x1` matrix.
#[derive(Debug)]
pub struct ReduceSum<T: Element> {
    x: Node<T>,
}

impl<T: Element> ReduceSum<T> {
    pub fn new(x: Node<T>) -> Self {
        ReduceSum { x }
    }
}

impl<T: Element> Function<T> for ReduceSum<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        Ok(self.x.value()?.sum())
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if !self.x.requires_grad() {
            return Ok(());
        }
        let g = grad_output.scalar_value()?;
        let x = self.x.value()?;
        self.x.acc_grad(&Matrix::full(x.rows(), x.cols(), g))
    }
}

// --- Builder ---

/// Returns a `1x1` node holding the sum of all elements of `x`.
pub fn reduce_sum_op<T: Element>(x: &Node<T>) -> Node<T> {
    Operator::new(ReduceSum::new(x.clone())).into_node()
}

#[cfg(test)]
#[path = "sum_test.rs"]
mod tests;
