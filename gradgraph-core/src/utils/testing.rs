use crate::mat::{Element, Matrix};

/// Checks if two matrices are approximately equal (shape and data within tolerance).
/// Panics if shapes differ or data differs significantly.
pub fn check_matrix_near<T: Element>(
    actual: &Matrix<T>,
    expected_shape: (usize, usize),
    expected_data: &[T],
    tolerance: T,
) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    assert_eq!(
        actual.data().len(),
        expected_data.len(),
        "Data length mismatch"
    );

    for (i, (a, e)) in actual.data().iter().zip(expected_data.iter()).enumerate() {
        let diff = (*a - *e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}
