use crate::autograd::function::Function;
use crate::autograd::grad_cell::GradCell;
use crate::autograd::node::{DualValue, Node, NodeId};
use crate::autograd::time_step;
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix, MatrixPool};
use crate::utils::sync::{lock_or_recover, read_or_recover, wait_or_recover, write_or_recover};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, RwLock};

const FORWARD_STATE: &str = "operator forward state";

/// Forward evaluation state of an operator.
///
/// `Pending -> Running -> Done | Failed`, and any state `-> Released`.
/// Exactly one caller performs the `Pending -> Running` transition.
enum ForwardState<T: Element> {
    Pending,
    Running,
    Done(Arc<Matrix<T>>),
    Failed(GradGraphError),
    Released,
}

/// Internal graph node wrapping a [`Function`].
///
/// The value is computed lazily on the first [`value`](DualValue::value) call
/// and memoized. Reads of a settled value only take the shared side of the
/// state lock. Callers arriving while another thread computes the value block
/// on a condition variable until the result (or the failure) is published.
pub struct Operator<T: Element> {
    id: NodeId,
    name: &'static str,
    function: Box<dyn Function<T>>,
    operands: Vec<Node<T>>,
    requires_grad: bool,
    forward: RwLock<ForwardState<T>>,
    // Waiters sleep on `forward_done` holding `gate`; publishers notify under it.
    gate: Mutex<()>,
    forward_done: Condvar,
    grad: GradCell<T>,
}

impl<T: Element> Operator<T> {
    /// Creates an operator backed by the element type's default pool.
    pub fn new<F: Function<T> + 'static>(function: F) -> Self {
        Self::with_pool(function, T::default_pool())
    }

    /// Creates an operator whose value and gradient buffers return to `pool`.
    ///
    /// If a [`TimeStepHandler`](crate::autograd::TimeStepHandler) is active on the
    /// current thread, the operator is tagged with its current time step.
    pub fn with_pool<F: Function<T> + 'static>(function: F, pool: Arc<MatrixPool<T>>) -> Self {
        let operands = function.operands();
        let requires_grad =
            function.propagates_grad() && operands.iter().any(|o| o.requires_grad());
        let id = NodeId::next();
        let name = std::any::type_name::<F>();
        time_step::tag_with_active_handler(id);
        log::trace!("Created operator {} ({})", id, name);
        Operator {
            id,
            name,
            function: Box::new(function),
            operands,
            requires_grad,
            forward: RwLock::new(ForwardState::Pending),
            gate: Mutex::new(()),
            forward_done: Condvar::new(),
            grad: GradCell::new(pool),
        }
    }

    pub fn into_node(self) -> Node<T> {
        Node::new(self)
    }

    pub fn function(&self) -> &dyn Function<T> {
        self.function.as_ref()
    }

    /// Whether the value has been computed (successfully or not).
    pub fn is_evaluated(&self) -> bool {
        matches!(
            &*read_or_recover(&self.forward, FORWARD_STATE),
            ForwardState::Done(_) | ForwardState::Failed(_)
        )
    }

    pub fn is_released(&self) -> bool {
        matches!(
            &*read_or_recover(&self.forward, FORWARD_STATE),
            ForwardState::Released
        )
    }

    fn is_pending(&self) -> bool {
        matches!(
            &*read_or_recover(&self.forward, FORWARD_STATE),
            ForwardState::Pending
        )
    }

    /// The outcome of a settled forward, `None` while pending or running.
    fn settled(&self) -> Option<Result<Arc<Matrix<T>>, GradGraphError>> {
        match &*read_or_recover(&self.forward, FORWARD_STATE) {
            ForwardState::Done(value) => Some(Ok(Arc::clone(value))),
            ForwardState::Failed(err) => Some(Err(err.clone())),
            ForwardState::Released => Some(Err(GradGraphError::UseAfterRelease { node: self.id })),
            ForwardState::Pending | ForwardState::Running => None,
        }
    }

    fn forward_value(&self) -> Result<Arc<Matrix<T>>, GradGraphError> {
        if let Some(outcome) = self.settled() {
            return outcome;
        }
        self.evaluate_operands();
        if !self.claim() {
            return self.wait_settled();
        }

        let mut guard = RunningGuard {
            operator: self,
            armed: true,
        };
        let outcome = self.function.forward().map(Arc::new);
        guard.armed = false;

        match &outcome {
            Ok(value) => self.publish(ForwardState::Done(Arc::clone(value))),
            Err(err) => {
                log::debug!("Forward of operator {} failed: {}", self.id, err);
                self.publish(ForwardState::Failed(err.clone()))
            }
        }
        outcome
    }

    /// Computes the pending operators below this one, deepest first.
    ///
    /// The `value()` calls made by `Function::forward` then find their operands
    /// settled, so call depth does not grow with graph depth. Failures stay on
    /// the failing operator and surface through the caller's own forward.
    fn evaluate_operands(&self) {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<(Node<T>, bool)> =
            self.operands.iter().map(|o| (o.clone(), false)).collect();
        while let Some((node, operands_done)) = stack.pop() {
            let Some(operator) = node.as_operator() else {
                continue;
            };
            if operands_done {
                let _ = operator.forward_value();
                continue;
            }
            if !operator.is_pending() || !seen.insert(operator.id) {
                continue;
            }
            stack.push((node.clone(), true));
            stack.extend(operator.operands.iter().map(|o| (o.clone(), false)));
        }
    }

    /// Moves `Pending -> Running`. Returns `false` if another caller got there first.
    fn claim(&self) -> bool {
        let mut state = write_or_recover(&self.forward, FORWARD_STATE);
        if matches!(&*state, ForwardState::Pending) {
            *state = ForwardState::Running;
            true
        } else {
            false
        }
    }

    fn wait_settled(&self) -> Result<Arc<Matrix<T>>, GradGraphError> {
        let mut gate = lock_or_recover(&self.gate, FORWARD_STATE);
        loop {
            if let Some(outcome) = self.settled() {
                return outcome;
            }
            gate = wait_or_recover(&self.forward_done, gate, FORWARD_STATE);
        }
    }

    fn notify_waiters(&self) {
        let _gate = lock_or_recover(&self.gate, FORWARD_STATE);
        self.forward_done.notify_all();
    }

    /// Stores the forward outcome and wakes every waiter. A release that raced
    /// with the computation wins: the fresh value is dropped.
    fn publish(&self, outcome: ForwardState<T>) {
        {
            let mut state = write_or_recover(&self.forward, FORWARD_STATE);
            if !matches!(&*state, ForwardState::Released) {
                *state = outcome;
            }
        }
        self.notify_waiters();
    }

    /// Runs this operator's backward step with its accumulated gradient.
    ///
    /// Returns `Ok(false)` when there was nothing to propagate.
    pub(crate) fn backward_step(&self) -> Result<bool, GradGraphError> {
        if !self.requires_grad {
            return Ok(false);
        }
        let grad = match self.grad.get(self.id)? {
            Some(grad) => grad,
            None => return Ok(false),
        };
        let value = self.forward_value()?;
        if !value.same_dims(&grad) {
            return Err(GradGraphError::ShapeMismatch {
                expected: value.shape(),
                actual: grad.shape(),
                operation: format!("backward of operator {}", self.id),
            });
        }
        self.function.backward(&grad)?;
        Ok(true)
    }

    /// Returns the value and gradient buffers to the pool and invalidates the node.
    ///
    /// Returns `false` if the operator had already been released.
    pub(crate) fn release(&self) -> bool {
        let previous = std::mem::replace(
            &mut *write_or_recover(&self.forward, FORWARD_STATE),
            ForwardState::Released,
        );
        if let ForwardState::Released = previous {
            return false;
        }
        if let ForwardState::Done(value) = previous {
            // Only recycle when no caller still holds the value.
            if let Ok(value) = Arc::try_unwrap(value) {
                self.grad.pool().release(value);
            }
        }
        self.grad.release();
        self.notify_waiters();
        true
    }

    /// Drops the function and hands back the operand handles.
    pub(crate) fn detach_operands(&mut self) -> Vec<Node<T>> {
        self.function = Box::new(Detached);
        std::mem::take(&mut self.operands)
    }
}

/// Stand-in function of an operator being torn down.
#[derive(Debug)]
struct Detached;

impl<T: Element> Function<T> for Detached {
    fn operands(&self) -> Vec<Node<T>> {
        Vec::new()
    }

    fn forward(&self) -> Result<Matrix<T>, GradGraphError> {
        Err(GradGraphError::InternalError(
            "forward of a detached operator".to_string(),
        ))
    }

    fn backward(&self, _grad_output: &Matrix<T>) -> Result<(), GradGraphError> {
        Ok(())
    }
}

/// Tears the subgraph down iteratively: operands held only by this operator
/// are unwrapped here instead of in nested drops.
impl<T: Element> Drop for Operator<T> {
    fn drop(&mut self) {
        let mut stack = self.detach_operands();
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.take_unique_operands());
        }
    }
}

/// Marks the forward as failed if `Function::forward` unwinds, so that
/// waiters are woken instead of blocking forever.
struct RunningGuard<'a, T: Element> {
    operator: &'a Operator<T>,
    armed: bool,
}

impl<T: Element> Drop for RunningGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let node = self.operator.id;
            self.operator
                .publish(ForwardState::Failed(GradGraphError::ForwardPanicked { node }));
        }
    }
}

impl<T: Element> DualValue<T> for Operator<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn value(&self) -> Result<Arc<Matrix<T>>, GradGraphError> {
        self.forward_value()
    }

    fn grad(&self) -> Result<Option<Matrix<T>>, GradGraphError> {
        self.grad.get(self.id)
    }

    fn has_grad(&self) -> bool {
        self.grad.is_present()
    }

    /// An operator requires gradients when at least one operand does, unless
    /// its function stops gradient flow.
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

    fn operands(&self) -> Vec<Node<T>> {
        self.operands.clone()
    }

    fn as_operator(&self) -> Option<&Operator<T>> {
        Some(self)
    }

    fn as_operator_mut(&mut self) -> Option<&mut Operator<T>> {
        Some(self)
    }
}

impl<T: Element> fmt::Debug for Operator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*read_or_recover(&self.forward, FORWARD_STATE) {
            ForwardState::Pending => "pending",
            ForwardState::Running => "running",
            ForwardState::Done(_) => "done",
            ForwardState::Failed(_) => "failed",
            ForwardState::Released => "released",
        };
        let operands: Vec<NodeId> = self.operands.iter().map(|o| o.id()).collect();
        f.debug_struct("Operator")
            .field("id", &self.id)
            .field("function", &self.name)
            .field("operands", &operands)
            .field("forward", &state)
            .field("requires_grad", &self.requires_grad)
            .field("grad", &self.grad)
            .finish()
    }
}

impl<T: Element> From<Operator<T>> for Node<T> {
    fn from(operator: Operator<T>) -> Self {
        Node::new(operator)
    }
}

#[cfg(test)]
#[path = "operator_test.rs"]
mod tests;
