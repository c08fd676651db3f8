use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Element-wise sum `x1 + x2` of two matrices of the same shape.
#[derive(Debug)]
pub struct Add<T: Element> {
    x1: Node<T>,
    x2: Node<T>,
}

impl<T: Element> Add<T> {
    pub fn new(x1: Node<T>, x2: Node<T>) -> Self {
        Add { x1, x2 }
    }
}

impl<T: Element> Function<T> for Add<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x1.clone(), self.x2.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        self.x1.value()?.add(&*self.x2.value()?)
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        // d(x1 + x2)/dxi = 1
        for x in [&self.x1, &self.x2] {
            if x.requires_grad() {
                x.acc_grad(grad_output)?;
            }
        }
        Ok(())
    }
}

// --- Builder ---

/// Returns a node computing `x1 + x2`.
pub fn add_op<T: Element>(x1: &Node<T>, x2: &Node<T>) -> Node<T> {
    Operator::new(Add::new(x1.clone(), x2.clone())).into_node()
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
