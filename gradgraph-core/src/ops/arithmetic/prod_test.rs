use super::*;
use crate::autograd::grad_check::check_grad;
use crate::autograd::{backward_with_grad, var, var_with_grad};
use crate::utils::testing::check_matrix_near;

#[test]
fn test_prod_forward() {
    let a = var(Matrix::new(vec![1.0f64, 2.0, 3.0, 4.0], 2, 2).unwrap());
    let b = var(Matrix::new(vec![-1.0f64, 0.5, 2.0, 0.0], 2, 2).unwrap());
    let y = prod_op(&a, &b);
    check_matrix_near(&y.value().unwrap(), (2, 2), &[-1.0, 1.0, 6.0, 0.0], 0.0);
}

#[test]
fn test_prod_backward() {
    let a = var_with_grad(Matrix::from_vec(vec![2.0f64, 3.0]));
    let b = var_with_grad(Matrix::from_vec(vec![5.0f64, -1.0]));
    let y = prod_op(&a, &b);
    backward_with_grad(&y, &Matrix::from_vec(vec![1.0, 2.0])).unwrap();
    check_matrix_near(&a.grad().unwrap().unwrap(), (2, 1), &[5.0, -2.0], 0.0);
    check_matrix_near(&b.grad().unwrap().unwrap(), (2, 1), &[2.0, 6.0], 0.0);
}

#[test]
fn test_prod_of_node_with_itself() {
    let x = var_with_grad(Matrix::scalar(3.0f64));
    let y = prod_op(&x, &x);
    crate::autograd::backward(&y).unwrap();
    assert_eq!(x.grad().unwrap(), Some(Matrix::scalar(6.0)));
}

#[test]
fn test_prod_grad_check() {
    let a = Matrix::new(vec![1.0f64, -2.0, 0.5, 3.0, 0.1, -0.7], 3, 2).unwrap();
    let b = Matrix::new(vec![0.3f64, 2.0, -1.5, 1.0, 4.0, 2.5], 3, 2).unwrap();
    check_grad(
        |inputs| Ok(prod_op(&inputs[0], &inputs[1])),
        &[a, b],
        &Matrix::ones(3, 2),
        1e-6,
        1e-5,
    )
    .unwrap();
}
