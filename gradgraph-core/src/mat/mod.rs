//! # Matrix layer (`mat`)
//!
//! Dense row-major matrices and the size-class pool that recycles their
//! backing buffers. The autograd engine only relies on shape introspection,
//! cloning, in-place accumulation and the pool's get/release contract; the
//! remaining arithmetic exists for the differentiable functions in [`crate::ops`].

pub mod element;
pub mod matrix;
pub mod pool;

pub use element::Element;
pub use matrix::Matrix;
pub use pool::MatrixPool;
