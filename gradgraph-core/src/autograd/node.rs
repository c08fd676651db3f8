use crate::autograd::operator::Operator;
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};
use std::fmt::{self, Debug};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a graph node.
///
/// Ids are handed out at construction and never reused, so they are stable
/// keys for traversal bookkeeping and time-step tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability set of anything placed in a computation graph: a value, an
/// optional accumulated gradient and a `requires_grad` flag.
///
/// Implementations must be safe to share between threads: several backward
/// steps may accumulate into the same node concurrently, and several threads
/// may request the value of the same operator.
pub trait DualValue<T: Element>: Debug + Send + Sync {
    fn id(&self) -> NodeId;

    /// Returns the node value, computing it first if the node is a pending operator.
    ///
    /// # Errors
    /// Returns the forward failure of the node (or of one of its operands), or
    /// `UseAfterRelease` once the node's graph has been released.
    fn value(&self) -> Result<Arc<Matrix<T>>, GradGraphError>;

    /// Returns a copy of the accumulated gradient, `None` if nothing was accumulated
    /// since creation or since the last [`zero_grad`](Self::zero_grad).
    fn grad(&self) -> Result<Option<Matrix<T>>, GradGraphError>;

    fn has_grad(&self) -> bool;

    fn requires_grad(&self) -> bool;

    /// Adds `grad` into the node gradient. A no-op when the node does not require grad.
    fn acc_grad(&self, grad: &Matrix<T>) -> Result<(), GradGraphError>;

    /// Returns the gradient buffer to the pool and resets the gradient to `None`.
    fn zero_grad(&self);

    /// Nodes this one was computed from. Leaves have none.
    fn operands(&self) -> Vec<Node<T>> {
        Vec::new()
    }

    fn as_operator(&self) -> Option<&Operator<T>> {
        None
    }

    fn as_operator_mut(&mut self) -> Option<&mut Operator<T>> {
        None
    }
}

/// Shared handle to a graph node.
///
/// Cloning is cheap (reference count increment). Two handles are the same
/// node when [`Node::ptr_eq`] holds, which also implies equal [`NodeId`]s.
pub struct Node<T: Element>(Arc<dyn DualValue<T>>);

impl<T: Element> Node<T> {
    pub fn new<D: DualValue<T> + 'static>(value: D) -> Self {
        Node(Arc::new(value))
    }

    pub fn from_arc(inner: Arc<dyn DualValue<T>>) -> Self {
        Node(inner)
    }

    pub fn ptr_eq(&self, other: &Node<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_operator(&self) -> bool {
        self.0.as_operator().is_some()
    }

    /// Detaches the operands of an operator reachable only through this handle.
    /// Returns nothing for leaves and for shared nodes.
    pub(crate) fn take_unique_operands(&mut self) -> Vec<Node<T>> {
        Arc::get_mut(&mut self.0)
            .and_then(|inner| inner.as_operator_mut())
            .map(Operator::detach_operands)
            .unwrap_or_default()
    }

    /// Starts the forward computation of an operator on the rayon pool and
    /// returns immediately. A later [`value`](DualValue::value) call waits for it.
    ///
    /// Failures are kept on the operator and surface from `value()`.
    pub fn spawn_forward(&self) {
        if !self.is_operator() {
            return;
        }
        let node = self.clone();
        rayon::spawn(move || {
            if let Err(e) = node.value() {
                log::debug!("Background forward of node {} failed: {}", node.id(), e);
            }
        });
    }
}

impl<T: Element> Clone for Node<T> {
    fn clone(&self) -> Self {
        Node(Arc::clone(&self.0))
    }
}

impl<T: Element> Deref for Node<T> {
    type Target = dyn DualValue<T>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl<T: Element> Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}
