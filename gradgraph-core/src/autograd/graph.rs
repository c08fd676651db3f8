use crate::autograd::node::{Node, NodeId};
use crate::error::GradGraphError;
use crate::mat::Element;
use std::collections::{HashMap, HashSet};

/// An operator together with the operands that are themselves in the traversal.
struct Visited<T: Element> {
    node: Node<T>,
    operands: Vec<Node<T>>,
}

/// Depth-first discovery of the operators reachable from `roots`.
///
/// Only operators for which `expand` holds are entered; the others are
/// treated like leaves. Each operator appears once, however many paths reach it.
/// The walk uses an explicit stack, so deep unrolled graphs cannot overflow
/// the call stack.
fn discover<T, F>(roots: &[Node<T>], expand: &F) -> Vec<Visited<T>>
where
    T: Element,
    F: Fn(&Node<T>) -> bool,
{
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<Node<T>> = Vec::new();
    for root in roots {
        if root.is_operator() && expand(root) && seen.insert(root.id()) {
            stack.push(root.clone());
        }
    }

    let mut visited = Vec::new();
    while let Some(node) = stack.pop() {
        let operands: Vec<Node<T>> = node
            .operands()
            .into_iter()
            .filter(|operand| operand.is_operator() && expand(operand))
            .collect();
        for operand in &operands {
            if seen.insert(operand.id()) {
                stack.push(operand.clone());
            }
        }
        visited.push(Visited { node, operands });
    }
    visited
}

/// Every operator reachable from `roots`, each listed exactly once.
pub(crate) fn reachable_operators<T: Element>(roots: &[Node<T>]) -> Vec<Node<T>> {
    discover(roots, &|_: &Node<T>| true)
        .into_iter()
        .map(|v| v.node)
        .collect()
}

/// Reverse topological order of the operators reachable from `roots`.
///
/// Every operator comes after all the in-scope operators that read it, so a
/// backward pass run in this order sees each gradient fully accumulated before
/// it is propagated. Edges are counted with multiplicity: `f(x, x)` makes `x`
/// wait for both uses.
///
/// # Errors
/// `CycleDetected` if some operators can never become ready.
pub(crate) fn topological_order<T, F>(
    roots: &[Node<T>],
    expand: F,
) -> Result<Vec<Node<T>>, GradGraphError>
where
    T: Element,
    F: Fn(&Node<T>) -> bool,
{
    let visited = discover(roots, &expand);

    let mut pending: HashMap<NodeId, usize> = HashMap::with_capacity(visited.len());
    for v in &visited {
        for operand in &v.operands {
            *pending.entry(operand.id()).or_insert(0) += 1;
        }
    }
    let operands_of: HashMap<NodeId, &Vec<Node<T>>> =
        visited.iter().map(|v| (v.node.id(), &v.operands)).collect();

    let mut ready: Vec<Node<T>> = visited
        .iter()
        .filter(|v| !pending.contains_key(&v.node.id()))
        .map(|v| v.node.clone())
        .collect();
    let mut order = Vec::with_capacity(visited.len());

    while let Some(node) = ready.pop() {
        if let Some(operands) = operands_of.get(&node.id()) {
            for operand in operands.iter() {
                if let Some(count) = pending.get_mut(&operand.id()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(operand.clone());
                    }
                }
            }
        }
        order.push(node);
    }

    if order.len() != visited.len() {
        return Err(GradGraphError::CycleDetected);
    }
    Ok(order)
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
