use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

/// Reads the `1x1` value of a scaling node.
fn scalar_of<T: Element>(k: &Node<T>) -> Result<T, GradGraphError> {
    k.value()?.scalar_value()
}

// --- ProdScalar ---

/// `x * k` where `k` is a `1x1` node. Both `x` and `k` are differentiable.
#[derive(Debug)]
pub struct ProdScalar<T: Element> {
    x: Node<T>,
    k: Node<T>,
}

impl<T: Element> ProdScalar<T> {
    pub fn new(x: Node<T>, k: Node<T>) -> Self {
        ProdScalar { x, k }
    }
}

impl<T: Element> Function<T> for ProdScalar<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone(), self.k.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        let k = scalar_of(&self.k)?;
        Ok(self.x.value()?.prod_scalar(k))
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if self.x.requires_grad() {
            let k = scalar_of(&self.k)?;
            self.x.acc_grad(&grad_output.prod_scalar(k))?;
        }
        if self.k.requires_grad() {
            // dk = sum(grad_output * x)
            self.k.acc_grad(&grad_output.prod(&*self.x.value()?)?.sum())?;
        }
        Ok(())
    }
}

/// Returns a node computing `x * k` for a `1x1` node `k`.
pub fn prod_scalar_op<T: Element>(x: &Node<T>, k: &Node<T>) -> Node<T> {
    Operator::new(ProdScalar::new(x.clone(), k.clone())).into_node()
}

// --- DivScalar ---

/// `x / k` where `k` is a `1x1` node.
#[derive(Debug)]
pub struct DivScalar<T: Element> {
    x: Node<T>,
    k: Node<T>,
}

impl<T: Element> DivScalar<T> {
    pub fn new(x: Node<T>, k: Node<T>) -> Self {
        DivScalar { x, k }
    }
}

impl<T: Element> Function<T> for DivScalar<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone(), self.k.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        let k = scalar_of(&self.k)?;
        Ok(self.x.value()?.apply(|v| v / k))
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        let k = scalar_of(&self.k)?;
        if self.x.requires_grad() {
            self.x.acc_grad(&grad_output.apply(|g| g / k))?;
        }
        if self.k.requires_grad() {
            // dk = -sum(grad_output * x) / k^2
            let mut dk = grad_output.prod(&*self.x.value()?)?.sum();
            dk.prod_scalar_in_place(-(k * k).recip());
            self.k.acc_grad(&dk)?;
        }
        Ok(())
    }
}

/// Returns a node computing `x / k` for a `1x1` node `k`.
pub fn div_scalar_op<T: Element>(x: &Node<T>, k: &Node<T>) -> Node<T> {
    Operator::new(DivScalar::new(x.clone(), k.clone())).into_node()
}

#[cfg(test)]
#[path = "scalar_test.rs"]
mod tests;
