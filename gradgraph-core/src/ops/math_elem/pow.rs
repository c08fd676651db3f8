use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

// --- Function ---

/// Element-wise power `x^power` with a constant exponent.
#[derive(Debug)]
pub struct Pow<T: Element> {
    x: Node<T>,
    power: T,
}

impl<T: Element> Pow<T> {
    pub fn new(x: Node<T>, power: T) -> Self {
        Pow { x, power }
    }
}

impl<T: Element> Function<T> for Pow<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        Ok(self.x.value()?.pow(self.power))
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if !self.x.requires_grad() {
            return Ok(());
        }
        // d(x^p)/dx = p * x^(p-1)
        let p = self.power;
        let local = self.x.value()?.apply(|v| p * v.powf(p - T::one()));
        self.x.acc_grad(&grad_output.prod(&local)?)
    }
}

// --- Builder ---

/// Returns a node computing `x^power` element-wise.
pub fn pow_op<T: Element>(x: &Node<T>, power: T) -> Node<T> {
    Operator::new(Pow::new(x.clone(), power)).into_node()
}

#[cfg(test)]
#[path = "pow_test.rs"]
mod tests;
