use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// The `i`-th element of a vector (or of the row-major data), as a `1x1` matrix.
#[derive(Debug)]
pub struct AtVec<T: Element> {
    x: Node<T>,
    i: usize,
}

impl<T: Element> AtVec<T> {
    pub fn new(x: Node<T>, i: usize) -> Self {
        AtVec { x, i }
    }
}

impl<T: Element> Function<T> for AtVec<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        Ok(Matrix::scalar(self.x.value()?.at_vec(self.i)?))
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if !self.x.requires_grad() {
            return Ok(());
        }
        let x = self.x.value()?;
        let mut dx = Matrix::zeros(x.rows(), x.cols());
        let slot = dx
            .data_mut()
            .get_mut(self.i)
            .ok_or(GradGraphError::IndexOutOfBounds {
                index: (self.i, 0),
                shape: x.shape(),
            })?;
        *slot = grad_output.scalar_value()?;
        self.x.acc_grad(&dx)
    }
}

// --- Builder ---

/// Returns a `1x1` node holding element `i` of `x`.
pub fn at_vec_op<T: Element>(x: &Node<T>, i: usize) -> Node<T> {
    Operator::new(AtVec::new(x.clone(), i)).into_node()
}

#[cfg(test)]
#[path = "at_test.rs"]
mod tests;
