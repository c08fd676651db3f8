use crate::mat::pool::MatrixPool;
use num_traits::Float;
use once_cell::sync::Lazy;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::sync::Arc;

/// Scalar types a [`Matrix`](crate::mat::Matrix) can hold.
///
/// Implemented for `f32` and `f64`. Each type owns a lazily created,
/// process-wide [`MatrixPool`] that nodes fall back to when no pool is injected.
pub trait Element:
    Float
    + approx::AbsDiffEq<Epsilon = Self>
    + approx::RelativeEq
    + Debug
    + Display
    + Default
    + Sum
    + Send
    + Sync
    + 'static
{
    /// Returns the shared default pool for this element type.
    fn default_pool() -> Arc<MatrixPool<Self>>;
}

static F32_POOL: Lazy<Arc<MatrixPool<f32>>> = Lazy::new(|| Arc::new(MatrixPool::new()));
static F64_POOL: Lazy<Arc<MatrixPool<f64>>> = Lazy::new(|| Arc::new(MatrixPool::new()));

impl Element for f32 {
    fn default_pool() -> Arc<MatrixPool<f32>> {
        Arc::clone(&F32_POOL)
    }
}

impl Element for f64 {
    fn default_pool() -> Arc<MatrixPool<f64>> {
        Arc::clone(&F64_POOL)
    }
}
