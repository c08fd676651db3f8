use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Matrix product `x1 · x2` of an `m x k` and a `k x n` matrix.
#[derive(Debug)]
pub struct MatMul<T: Element> {
    x1: Node<T>,
    x2: Node<T>,
}

impl<T: Element> MatMul<T> {
    pub fn new(x1: Node<T>, x2: Node<T>) -> Self {
        MatMul { x1, x2 }
    }
}

impl<T: Element> Function<T> for MatMul<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x1.clone(), self.x2.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        self.x1.value()?.mat_mul(&*self.x2.value()?)
    }

    /// grad_x1 = grad_output · x2ᵀ, grad_x2 = x1ᵀ · grad_output
    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if self.x1.requires_grad() {
            self.x1.acc_grad(&grad_output.mat_mul(&self.x2.value()?.t())?)?;
        }
        if self.x2.requires_grad() {
            self.x2.acc_grad(&self.x1.value()?.t().mat_mul(grad_output)?)?;
        }
        Ok(())
    }
}

// --- Builder ---

/// Returns a node computing the matrix product `x1 · x2`.
pub fn mat_mul_op<T: Element>(x1: &Node<T>, x2: &Node<T>) -> Node<T> {
    Operator::new(MatMul::new(x1.clone(), x2.clone())).into_node()
}

#[cfg(test)]
#[path = "matmul_test.rs"]
mod tests;
