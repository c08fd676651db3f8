use crate::autograd::NodeId;
use thiserror::Error;

/// Custom error type for the gradgraph engine.
///
/// `Clone` is required: a failed forward computation is cached on its operator
/// and handed to every caller that waits on the same node.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GradGraphError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
        operation: String,
    },

    #[error("Shape mismatch during gradient accumulation: expected {expected:?}, got {actual:?}")]
    GradientAccumulationShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Matrix creation error: data length {data_len} does not match shape {rows}x{cols}")]
    DataLengthMismatch {
        data_len: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: (usize, usize),
        shape: (usize, usize),
    },

    #[error("Arguments must have the same length in {operation}: {left} != {right}")]
    LengthMismatch {
        left: usize,
        right: usize,
        operation: String,
    },

    #[error("Cannot apply {operation} to an empty list of nodes")]
    EmptyNodeList { operation: String },

    #[error("Node {node} was accessed after its graph had been released")]
    UseAfterRelease { node: NodeId },

    #[error("Forward computation of node {node} panicked")]
    ForwardPanicked { node: NodeId },

    #[error("Cycle detected in the computation graph during backward pass.")]
    CycleDetected,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
