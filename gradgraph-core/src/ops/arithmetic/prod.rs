use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Element-wise (Hadamard) product `x1 ⊙ x2`.
#[derive(Debug)]
pub struct Prod<T: Element> {
    x1: Node<T>,
    x2: Node<T>,
}

impl<T: Element> Prod<T> {
    pub fn new(x1: Node<T>, x2: Node<T>) -> Self {
        Prod { x1, x2 }
    }
}

impl<T: Element> Function<T> for Prod<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x1.clone(), self.x2.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        self.x1.value()?.prod(&*self.x2.value()?)
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        // grad_x1 = grad_output * x2, grad_x2 = grad_output * x1
        if self.x1.requires_grad() {
            self.x1.acc_grad(&grad_output.prod(&*self.x2.value()?)?)?;
        }
        if self.x2.requires_grad() {
            self.x2.acc_grad(&grad_output.prod(&*self.x1.value()?)?)?;
        }
        Ok(())
    }
}

// --- Builder ---

/// Returns a node computing the element-wise product of `x1` and `x2`.
pub fn prod_op<T: Element>(x1: &Node<T>, x2: &Node<T>) -> Node<T> {
    Operator::new(Prod::new(x1.clone(), x2.clone())).into_node()
}

#[cfg(test)]
#[path = "prod_test.rs"]
mod tests;
