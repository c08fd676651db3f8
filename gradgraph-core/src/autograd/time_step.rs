use crate::autograd::node::{Node, NodeId};
use crate::mat::Element;
use crate::utils::sync::lock_or_recover;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeBounds;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

thread_local! {
    static ACTIVE_HANDLERS: RefCell<Vec<Arc<TimeStepHandler>>> = const { RefCell::new(Vec::new()) };
}

/// Tags graph nodes with the logical time step they were created in.
///
/// Used to segment an unrolled recurrent computation for truncated
/// backpropagation through time. Nodes never seen by the handler report
/// step `0`, which is where parameters created before the first
/// [`inc_time_step`](Self::inc_time_step) naturally belong.
///
/// Operators pick up the current step automatically when they are built
/// while the handler is [entered](Self::enter) on the building thread.
///
/// ```
/// use gradgraph_core::autograd::{var_with_grad, TimeStepHandler};
/// use gradgraph_core::ops::arithmetic::add_op;
/// use gradgraph_core::Matrix;
/// use std::sync::Arc;
///
/// let tsh = Arc::new(TimeStepHandler::new());
/// let _scope = tsh.enter();
/// let w = var_with_grad(Matrix::scalar(1.0f64));
/// tsh.inc_time_step();
/// let h = add_op(&w, &w);
/// assert_eq!(tsh.node_time_step(&w), 0);
/// assert_eq!(tsh.node_time_step(&h), 1);
/// ```
pub struct TimeStepHandler {
    current: AtomicUsize,
    tags: Mutex<HashMap<NodeId, usize>>,
}

impl TimeStepHandler {
    pub fn new() -> Self {
        TimeStepHandler {
            current: AtomicUsize::new(0),
            tags: Mutex::new(HashMap::new()),
        }
    }

    pub fn current_time_step(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Advances the counter and returns the new current step.
    pub fn inc_time_step(&self) -> usize {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Tags `node` with the current step unless it already carries a tag.
    pub fn tag<T: Element>(&self, node: &Node<T>) {
        self.tag_id(node.id());
    }

    pub(crate) fn tag_id(&self, id: NodeId) {
        let step = self.current_time_step();
        lock_or_recover(&self.tags, "time step tags")
            .entry(id)
            .or_insert(step);
    }

    /// Step `node` was tagged with, `0` if it was never tagged.
    pub fn node_time_step<T: Element>(&self, node: &Node<T>) -> usize {
        self.time_step_of(node.id())
    }

    pub(crate) fn time_step_of(&self, id: NodeId) -> usize {
        lock_or_recover(&self.tags, "time step tags")
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether the step of `node` falls in `steps`.
    pub fn in_window<T: Element, R: RangeBounds<usize>>(&self, node: &Node<T>, steps: R) -> bool {
        steps.contains(&self.node_time_step(node))
    }

    /// Number of nodes carrying a tag.
    pub fn tagged(&self) -> usize {
        lock_or_recover(&self.tags, "time step tags").len()
    }

    /// Makes this handler the one tagging operators built on the current thread,
    /// until the returned scope is dropped. Scopes nest; the innermost wins.
    pub fn enter(self: &Arc<Self>) -> TimeStepScope {
        ACTIVE_HANDLERS.with(|stack| stack.borrow_mut().push(Arc::clone(self)));
        TimeStepScope {
            handler: Arc::clone(self),
            _not_send: PhantomData,
        }
    }
}

impl Default for TimeStepHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimeStepHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeStepHandler")
            .field("current", &self.current_time_step())
            .field("tagged", &self.tagged())
            .finish()
    }
}

/// Guard returned by [`TimeStepHandler::enter`]. Bound to the thread that created it.
#[must_use = "the handler is deactivated as soon as the scope is dropped"]
pub struct TimeStepScope {
    handler: Arc<TimeStepHandler>,
    _not_send: PhantomData<Rc<()>>,
}

impl TimeStepScope {
    pub fn handler(&self) -> &Arc<TimeStepHandler> {
        &self.handler
    }
}

impl Drop for TimeStepScope {
    fn drop(&mut self) {
        ACTIVE_HANDLERS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|h| Arc::ptr_eq(h, &self.handler)) {
                stack.remove(pos);
            }
        });
    }
}

impl fmt::Debug for TimeStepScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeStepScope")
            .field("handler", &self.handler)
            .finish()
    }
}

/// The innermost handler entered on the current thread.
pub(crate) fn active_handler() -> Option<Arc<TimeStepHandler>> {
    ACTIVE_HANDLERS.with(|stack| stack.borrow().last().cloned())
}

pub(crate) fn tag_with_active_handler(id: NodeId) {
    if let Some(handler) = active_handler() {
        handler.tag_id(id);
    }
}

#[cfg(test)]
#[path = "time_step_test.rs"]
mod tests;
