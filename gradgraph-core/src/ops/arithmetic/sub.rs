use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Element-wise difference `x1 - x2`.
#[derive(Debug)]
pub struct Sub<T: Element> {
    x1: Node<T>,
    x2: Node<T>,
}

impl<T: Element> Sub<T> {
    pub fn new(x1: Node<T>, x2: Node<T>) -> Self {
        Sub { x1, x2 }
    }
}

impl<T: Element> Function<T> for Sub<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x1.clone(), self.x2.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        self.x1.value()?.sub(&*self.x2.value()?)
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if self.x1.requires_grad() {
            self.x1.acc_grad(grad_output)?;
        }
        if self.x2.requires_grad() {
            self.x2.acc_grad(&grad_output.prod_scalar(-T::one()))?;
        }
        Ok(())
    }
}

// --- Builder ---

/// Returns a node computing `x1 - x2`.
pub fn sub_op<T: Element>(x1: &Node<T>, x2: &Node<T>) -> Node<T> {
    Operator::new(Sub::new(x1.clone(), x2.clone())).into_node()
}

#[cfg(test)]
#[path = "sub_test.rs"]
mod tests;
