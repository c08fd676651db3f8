use crate::autograd::grad_cell::GradCell;
use crate::autograd::node::{DualValue, Node, NodeId};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix, MatrixPool};
use std::fmt;
use std::sync::Arc;

/// Leaf node holding a directly assigned value.
///
/// The value is owned outside the graph (a model parameter, an input tensor)
/// and is never released by [`release_graph`](crate::autograd::release_graph).
/// Gradients are accumulated only when the variable requires them.
pub struct Variable<T: Element> {
    id: NodeId,
    value: Arc<Matrix<T>>,
    grad: GradCell<T>,
    requires_grad: bool,
    name: Option<String>,
}

impl<T: Element> Variable<T> {
    /// Creates a variable that does not require gradients.
    pub fn new(value: Matrix<T>) -> Self {
        Self::from_shared(Arc::new(value))
    }

    /// Wraps a value that is shared with its owner, without copying it.
    pub fn from_shared(value: Arc<Matrix<T>>) -> Self {
        Variable {
            id: NodeId::next(),
            value,
            grad: GradCell::new(T::default_pool()),
            requires_grad: false,
            name: None,
        }
    }

    /// Sets whether the variable requires gradients.
    pub fn with_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Uses `pool` for the gradient buffer instead of the element type's default pool.
    pub fn with_pool(mut self, pool: Arc<MatrixPool<T>>) -> Self {
        self.grad = GradCell::new(pool);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn into_node(self) -> Node<T> {
        Node::new(self)
    }
}

impl<T: Element> DualValue<T> for Variable<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn value(&self) -> Result<Arc<Matrix<T>>, GradGraphError> {
        Ok(Arc::clone(&self.value))
    }

    fn grad(&self) -> Result<Option<Matrix<T>>, GradGraphError> {
        self.grad.get(self.id)
    }

    fn has_grad(&self) -> bool {
        self.grad.is_present()
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn acc_grad(&self, grad: &Matrix<T>) -> Result<(), GradGraphError> {
        if !self.requires_grad {
            return Ok(());
        }
        self.grad.accumulate(self.id, grad)
    }

    fn zero_grad(&self) {
        self.grad.zero();
    }
}

impl<T: Element> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shape", &self.value.shape())
            .field("requires_grad", &self.requires_grad)
            .field("grad", &self.grad)
            .finish()
    }
}

impl<T: Element> From<Variable<T>> for Node<T> {
    fn from(variable: Variable<T>) -> Self {
        Node::new(variable)
    }
}

/// Creates a leaf node that does not require gradients.
pub fn var<T: Element>(value: Matrix<T>) -> Node<T> {
    Variable::new(value).into_node()
}

/// Creates a leaf node that accumulates gradients.
pub fn var_with_grad<T: Element>(value: Matrix<T>) -> Node<T> {
    Variable::new(value).with_grad(true).into_node()
}

/// Creates a `1x1` leaf node that does not require gradients.
pub fn scalar<T: Element>(value: T) -> Node<T> {
    var(Matrix::scalar(value))
}

#[cfg(test)]
#[path = "variable_test.rs"]
mod tests;
