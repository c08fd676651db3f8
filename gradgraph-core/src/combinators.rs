//! Helpers building graph fragments over lists of nodes.

use crate::autograd::time_step::active_handler;
use crate::autograd::{scalar, Node};
use crate::error::GradGraphError;
use crate::mat::Element;
use crate::ops::arithmetic::{add_op, div_scalar_op};
use crate::ops::view::at_vec_op;
use rayon::prelude::*;

/// Applies `mapping` to every node.
pub fn map<T, F>(xs: &[Node<T>], mapping: F) -> Vec<Node<T>>
where
    T: Element,
    F: Fn(&Node<T>) -> Node<T>,
{
    xs.iter().map(mapping).collect()
}

/// Concurrent version of [`map`], run on the rayon pool.
///
/// The time-step handler active on the calling thread stays active while
/// `mapping` runs, so operators built by the workers are tagged as if they
/// had been built by the caller. Results keep the input order.
pub fn map_concurrent<T, F>(xs: &[Node<T>], mapping: F) -> Vec<Node<T>>
where
    T: Element,
    F: Fn(&Node<T>) -> Node<T> + Send + Sync,
{
    let handler = active_handler();
    xs.par_iter()
        .map(|x| {
            let _scope = handler.as_ref().map(|h| h.enter());
            mapping(x)
        })
        .collect()
}

fn check_same_len(left: usize, right: usize, operation: &str) -> Result<(), GradGraphError> {
    if left != right {
        return Err(GradGraphError::LengthMismatch {
            left,
            right,
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Applies `mapping` pairwise to the items of `xs1` and `xs2`.
///
/// # Errors
/// `LengthMismatch` if the lists differ in length.
pub fn map2<T, F>(xs1: &[Node<T>], xs2: &[Node<T>], mapping: F) -> Result<Vec<Node<T>>, GradGraphError>
where
    T: Element,
    F: Fn(&Node<T>, &Node<T>) -> Node<T>,
{
    check_same_len(xs1.len(), xs2.len(), "map2")?;
    Ok(xs1.iter().zip(xs2).map(|(a, b)| mapping(a, b)).collect())
}

/// Concurrent version of [`map2`], with the same handler propagation as [`map_concurrent`].
pub fn map2_concurrent<T, F>(
    xs1: &[Node<T>],
    xs2: &[Node<T>],
    mapping: F,
) -> Result<Vec<Node<T>>, GradGraphError>
where
    T: Element,
    F: Fn(&Node<T>, &Node<T>) -> Node<T> + Send + Sync,
{
    check_same_len(xs1.len(), xs2.len(), "map2_concurrent")?;
    let handler = active_handler();
    Ok(xs1
        .par_iter()
        .zip(xs2.par_iter())
        .map(|(a, b)| {
            let _scope = handler.as_ref().map(|h| h.enter());
            mapping(a, b)
        })
        .collect())
}

/// Truncates or extends `xs` to `seq_len` items. Missing items are built by
/// `padding`, which receives their index.
pub fn pad<T, F>(xs: &[Node<T>], seq_len: usize, padding: F) -> Vec<Node<T>>
where
    T: Element,
    F: Fn(usize) -> Node<T>,
{
    if xs.len() >= seq_len {
        return xs[..seq_len].to_vec();
    }
    let mut padded = Vec::with_capacity(seq_len);
    padded.extend_from_slice(xs);
    padded.extend((xs.len()..seq_len).map(padding));
    padded
}

/// Element-wise sum of all nodes, as a chain of additions.
///
/// # Errors
/// `EmptyNodeList` if `xs` is empty.
pub fn sum<T: Element>(xs: &[Node<T>]) -> Result<Node<T>, GradGraphError> {
    let (first, rest) = xs.split_first().ok_or_else(|| GradGraphError::EmptyNodeList {
        operation: "sum".to_string(),
    })?;
    Ok(rest.iter().fold(first.clone(), |acc, x| add_op(&acc, x)))
}

/// Element-wise mean of all nodes.
///
/// # Errors
/// `EmptyNodeList` if `xs` is empty.
pub fn mean<T: Element>(xs: &[Node<T>]) -> Result<Node<T>, GradGraphError> {
    let total = sum(xs).map_err(|_| GradGraphError::EmptyNodeList {
        operation: "mean".to_string(),
    })?;
    let n = T::from(xs.len()).ok_or_else(|| {
        GradGraphError::InternalError(format!("{} is not representable as an element", xs.len()))
    })?;
    Ok(div_scalar_op(&total, &scalar(n)))
}

/// One `1x1` node per element of `x`, in row-major order.
///
/// # Errors
/// The forward failure of `x`, whose value is needed to know its size.
pub fn separate_vec<T: Element>(x: &Node<T>) -> Result<Vec<Node<T>>, GradGraphError> {
    let size = x.value()?.size();
    Ok((0..size).map(|i| at_vec_op(x, i)).collect())
}

#[cfg(test)]
#[path = "combinators_test.rs"]
mod tests;
