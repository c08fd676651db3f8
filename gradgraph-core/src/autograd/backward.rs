use crate::autograd::graph::topological_order;
use crate::autograd::node::Node;
use crate::autograd::time_step::TimeStepHandler;
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};
use log::{debug, trace};

/// Runs the backward pass from `root`, seeded with a gradient of ones shaped
/// like its value.
///
/// Gradients accumulate into every node that requires them; call
/// [`zero_grad`](crate::autograd::DualValue::zero_grad) between passes.
///
/// # Errors
/// Any forward failure met while seeding, any failing
/// [`Function::backward`](crate::autograd::Function::backward) and gradient
/// shape mismatches. Gradients accumulated before the failure are left in place.
pub fn backward<T: Element>(root: &Node<T>) -> Result<(), GradGraphError> {
    backward_many(std::slice::from_ref(root))
}

/// Runs the backward pass from `root`, seeded with `grad`.
///
/// # Errors
/// `ShapeMismatch` if `grad` is not shaped like the value of `root`, plus the
/// errors of [`backward`].
pub fn backward_with_grad<T: Element>(root: &Node<T>, grad: &Matrix<T>) -> Result<(), GradGraphError> {
    let value = root.value()?;
    if !value.same_dims(grad) {
        return Err(GradGraphError::ShapeMismatch {
            expected: value.shape(),
            actual: grad.shape(),
            operation: "backward seed".to_string(),
        });
    }
    root.acc_grad(grad)?;
    propagate(std::slice::from_ref(root), |_| true)
}

/// Runs a single backward pass from several roots, each seeded with ones.
///
/// Operators shared between the roots' graphs run their backward step once,
/// after the contributions of all roots have reached them.
pub fn backward_many<T: Element>(roots: &[Node<T>]) -> Result<(), GradGraphError> {
    seed_with_ones(roots)?;
    propagate(roots, |_| true)
}

/// Backward pass limited to operators tagged by `handler` with a step of at
/// least `from_step`.
///
/// Older operators still receive their gradient contributions but do not
/// propagate them further, which truncates backpropagation through time.
pub fn backward_truncated<T: Element>(
    roots: &[Node<T>],
    handler: &TimeStepHandler,
    from_step: usize,
) -> Result<(), GradGraphError> {
    seed_with_ones(roots)?;
    propagate(roots, |node| handler.time_step_of(node.id()) >= from_step)
}

fn seed_with_ones<T: Element>(roots: &[Node<T>]) -> Result<(), GradGraphError> {
    for root in roots.iter().filter(|r| r.requires_grad()) {
        let value = root.value()?;
        root.acc_grad(&value.ones_like())?;
    }
    Ok(())
}

fn propagate<T, F>(roots: &[Node<T>], in_scope: F) -> Result<(), GradGraphError>
where
    T: Element,
    F: Fn(&Node<T>) -> bool,
{
    let order = topological_order(roots, |node| node.requires_grad() && in_scope(node))?;
    debug!("Backward pass over {} operators from {} roots", order.len(), roots.len());

    let mut stepped = 0usize;
    for node in &order {
        let Some(operator) = node.as_operator() else {
            continue;
        };
        if operator.backward_step()? {
            trace!("Propagated gradient of operator {}", node.id());
            stepped += 1;
        }
    }
    debug!("Backward pass done: {} of {} operators propagated", stepped, order.len());
    Ok(())
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
