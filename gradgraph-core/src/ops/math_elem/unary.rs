use crate::autograd::{Function, Node, Operator};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};

/// The element-wise function applied by [`UnaryElementwise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    Exp,
    Log,
    Tanh,
    Sigmoid,
    Relu,
}

impl UnaryKind {
    fn apply<T: Element>(self, v: T) -> T {
        match self {
            UnaryKind::Exp => v.exp(),
            UnaryKind::Log => v.ln(),
            UnaryKind::Tanh => v.tanh(),
            UnaryKind::Sigmoid => T::one() / (T::one() + (-v).exp()),
            UnaryKind::Relu => v.max(T::zero()),
        }
    }

    /// Derivative at input `x`, given the forward output `y = f(x)`.
    fn derivative<T: Element>(self, x: T, y: T) -> T {
        match self {
            UnaryKind::Exp => y,
            UnaryKind::Log => x.recip(),
            UnaryKind::Tanh => T::one() - y * y,
            UnaryKind::Sigmoid => y * (T::one() - y),
            UnaryKind::Relu => {
                if x > T::zero() {
                    T::one()
                } else {
                    T::zero()
                }
            }
        }
    }
}

// --- Function ---

/// Applies a [`UnaryKind`] to every element of `x`.
#[derive(Debug)]
pub struct UnaryElementwise<T: Element> {
    x: Node<T>,
    kind: UnaryKind,
}

impl<T: Element> UnaryElementwise<T> {
    pub fn new(x: Node<T>, kind: UnaryKind) -> Self {
        UnaryElementwise { x, kind }
    }

    pub fn kind(&self) -> UnaryKind {
        self.kind
    }
}

impl<T: Element> Function<T> for UnaryElementwise<T> {
    fn operands(&self) -> Vec<Node<T>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        let kind = self.kind;
        Ok(self.x.value()?.apply(|v| kind.apply(v)))
    }

    fn backward(&self, grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        if !self.x.requires_grad() {
            return Ok(());
        }
        let kind = self.kind;
        let x = self.x.value()?;
        let mut local = x.apply(|v| kind.derivative(v, kind.apply(v)));
        local.prod_in_place(grad_output)?;
        self.x.acc_grad(&local)
    }
}

// --- Builders ---

fn unary_op<T: Element>(x: &Node<T>, kind: UnaryKind) -> Node<T> {
    Operator::new(UnaryElementwise::new(x.clone(), kind)).into_node()
}

/// Returns a node computing `e^x` element-wise.
pub fn exp_op<T: Element>(x: &Node<T>) -> Node<T> {
    unary_op(x, UnaryKind::Exp)
}

/// Returns a node computing the natural logarithm element-wise.
pub fn log_op<T: Element>(x: &Node<T>) -> Node<T> {
    unary_op(x, UnaryKind::Log)
}

pub fn tanh_op<T: Element>(x: &Node<T>) -> Node<T> {
    unary_op(x, UnaryKind::Tanh)
}

/// Returns a node computing `1 / (1 + e^-x)` element-wise.
pub fn sigmoid_op<T: Element>(x: &Node<T>) -> Node<T> {
    unary_op(x, UnaryKind::Sigmoid)
}

/// Returns a node computing `max(0, x)` element-wise. The gradient at `0` is `0`.
pub fn relu_op<T: Element>(x: &Node<T>) -> Node<T> {
    unary_op(x, UnaryKind::Relu)
}

#[cfg(test)]
#[path = "unary_test.rs"]
mod tests;
