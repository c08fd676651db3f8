use crate::autograd::node::NodeId;
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix, MatrixPool};
use crate::utils::sync::lock_or_recover;
use std::fmt;
use std::sync::{Arc, Mutex};

enum GradState<T: Element> {
    Empty,
    Present(Matrix<T>),
    Released,
}

/// Lock-protected gradient slot shared by variables and operators.
///
/// The lock is held only for the duration of a single read, accumulation or
/// reset; it is never held while another node's lock is taken.
pub(crate) struct GradCell<T: Element> {
    state: Mutex<GradState<T>>,
    pool: Arc<MatrixPool<T>>,
}

impl<T: Element> GradCell<T> {
    pub(crate) fn new(pool: Arc<MatrixPool<T>>) -> Self {
        GradCell {
            state: Mutex::new(GradState::Empty),
            pool,
        }
    }

    pub(crate) fn pool(&self) -> &Arc<MatrixPool<T>> {
        &self.pool
    }

    pub(crate) fn get(&self, node: NodeId) -> Result<Option<Matrix<T>>, GradGraphError> {
        match &*lock_or_recover(&self.state, "gradient") {
            GradState::Empty => Ok(None),
            GradState::Present(grad) => Ok(Some(grad.clone())),
            GradState::Released => Err(GradGraphError::UseAfterRelease { node }),
        }
    }

    pub(crate) fn is_present(&self) -> bool {
        matches!(
            &*lock_or_recover(&self.state, "gradient"),
            GradState::Present(_)
        )
    }

    /// The first accumulation stores a pooled copy of `grad`; later ones add in place.
    pub(crate) fn accumulate(&self, node: NodeId, grad: &Matrix<T>) -> Result<(), GradGraphError> {
        let mut state = lock_or_recover(&self.state, "gradient");
        match &mut *state {
            GradState::Empty => {
                *state = GradState::Present(self.pool.get_copy(grad));
                Ok(())
            }
            GradState::Present(existing) => existing.add_in_place(grad).map_err(|_| {
                GradGraphError::GradientAccumulationShapeMismatch {
                    expected: existing.shape(),
                    actual: grad.shape(),
                }
            }),
            GradState::Released => Err(GradGraphError::UseAfterRelease { node }),
        }
    }

    pub(crate) fn zero(&self) {
        let previous = {
            let mut state = lock_or_recover(&self.state, "gradient");
            if !matches!(*state, GradState::Present(_)) {
                return;
            }
            std::mem::replace(&mut *state, GradState::Empty)
        };
        if let GradState::Present(grad) = previous {
            self.pool.release(grad);
        }
    }

    /// Returns the buffer to the pool and poisons the slot for good.
    pub(crate) fn release(&self) {
        let previous = std::mem::replace(
            &mut *lock_or_recover(&self.state, "gradient"),
            GradState::Released,
        );
        if let GradState::Present(grad) = previous {
            self.pool.release(grad);
        }
    }
}

impl<T: Element> fmt::Debug for GradCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*lock_or_recover(&self.state, "gradient") {
            GradState::Empty => "empty",
            GradState::Present(_) => "present",
            GradState::Released => "released",
        };
        f.write_str(state)
    }
}
