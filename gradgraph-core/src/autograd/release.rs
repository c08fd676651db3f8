use crate::autograd::graph::reachable_operators;
use crate::autograd::node::Node;
use crate::mat::Element;

/// Releases every operator reachable from `roots`.
///
/// Values and gradients go back to the operators' pools, and any later
/// `value()`, `grad()` or `acc_grad()` on them fails with `UseAfterRelease`.
/// Variables are left untouched. An operator reached through several paths,
/// or already released by an earlier call, is not released twice.
///
/// Returns the number of operators released by this call.
pub fn release_graph<T: Element>(roots: &[Node<T>]) -> usize {
    let mut released = 0;
    for node in reachable_operators(roots) {
        if node.as_operator().is_some_and(|op| op.release()) {
            released += 1;
        }
    }
    log::debug!("Released {} operators", released);
    released
}

#[cfg(test)]
#[path = "release_test.rs"]
mod tests;
