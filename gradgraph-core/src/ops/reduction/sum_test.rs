use super::*;
use crate::autograd::grad_check::check_grad;
use crate::autograd::{backward, var, var_with_grad};
use crate::utils::testing::check_matrix_near;

#[test]
fn test_reduce_sum_forward() {
    let x = var(Matrix::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap());
    check_matrix_near(&reduce_sum_op(&x).value().unwrap(), (1, 1), &[21.0], 0.0);
}

#[test]
fn test_reduce_sum_of_empty_matrix() {
    let x = var(Matrix::<f64>::zeros(0, 3));
    check_matrix_near(&reduce_sum_op(&x).value().unwrap(), (1, 1), &[0.0], 0.0);
}

#[test]
fn test_reduce_sum_backward() {
    let x = var_with_grad(Matrix::new(vec![1.0f64, 2.0, 3.0, 4.0], 2, 2).unwrap());
    let y = reduce_sum_op(&x);
    backward(&y).unwrap();
    check_matrix_near(&x.grad().unwrap().unwrap(), (2, 2), &[1.0; 4], 0.0);
}

#[test]
fn test_reduce_sum_grad_check() {
    let x = Matrix::new(vec![0.5f64, -1.5, 2.0, 0.8, 0.3, 1.1], 3, 2).unwrap();
    check_grad(
        |inputs| Ok(reduce_sum_op(&inputs[0])),
        &[x],
        &Matrix::scalar(2.5),
        1e-6,
        1e-6,
    )
    .unwrap();
}
