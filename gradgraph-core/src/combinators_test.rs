use super::*;
use crate::autograd::{backward, var, var_with_grad, TimeStepHandler};
use crate::mat::Matrix;
use crate::ops::arithmetic::prod_op;
use crate::utils::testing::check_matrix_near;
use std::sync::Arc;

fn scalars(values: &[f64]) -> Vec<Node<f64>> {
    values.iter().map(|&v| var_with_grad(Matrix::scalar(v))).collect()
}

fn values(nodes: &[Node<f64>]) -> Vec<f64> {
    nodes
        .iter()
        .map(|n| n.value().unwrap().scalar_value().unwrap())
        .collect()
}

#[test]
fn test_map() {
    let xs = scalars(&[1.0, 2.0, 3.0]);
    let ys = map(&xs, |x| prod_op(x, x));
    assert_eq!(values(&ys), vec![1.0, 4.0, 9.0]);
}

#[test]
fn test_map_concurrent_keeps_order() {
    let xs = scalars(&(0..64).map(f64::from).collect::<Vec<_>>());
    let ys = map_concurrent(&xs, |x| prod_op(x, x));
    let expected: Vec<f64> = (0..64).map(|i| f64::from(i * i)).collect();
    assert_eq!(values(&ys), expected);
}

#[test]
fn test_map_concurrent_propagates_time_step_handler() {
    let tsh = Arc::new(TimeStepHandler::new());
    let _scope = tsh.enter();
    tsh.inc_time_step();
    tsh.inc_time_step();

    let xs = scalars(&[1.0, 2.0, 3.0, 4.0]);
    let ys = map_concurrent(&xs, |x| add_op(x, x));
    for y in &ys {
        assert_eq!(tsh.node_time_step(y), 2);
    }
    assert_eq!(tsh.tagged(), 4);
}

#[test]
fn test_map2() {
    let xs1 = scalars(&[1.0, 2.0]);
    let xs2 = scalars(&[10.0, 20.0]);
    let ys = map2(&xs1, &xs2, add_op).unwrap();
    assert_eq!(values(&ys), vec![11.0, 22.0]);

    let ys = map2_concurrent(&xs1, &xs2, prod_op).unwrap();
    assert_eq!(values(&ys), vec![10.0, 40.0]);
}

#[test]
fn test_map2_length_mismatch() {
    let xs1 = scalars(&[1.0, 2.0]);
    let xs2 = scalars(&[1.0]);
    let expected = GradGraphError::LengthMismatch {
        left: 2,
        right: 1,
        operation: "map2".to_string(),
    };
    assert_eq!(map2(&xs1, &xs2, add_op).unwrap_err(), expected);
    assert!(matches!(
        map2_concurrent(&xs1, &xs2, add_op),
        Err(GradGraphError::LengthMismatch { left: 2, right: 1, .. })
    ));
}

#[test]
fn test_pad() {
    let xs = scalars(&[1.0, 2.0, 3.0]);

    let same = pad(&xs, 3, |_| unreachable!());
    assert!(same.iter().zip(&xs).all(|(a, b)| a.ptr_eq(b)));

    let shorter = pad(&xs, 2, |_| unreachable!());
    assert_eq!(values(&shorter), vec![1.0, 2.0]);

    let longer = pad(&xs, 5, |i| var(Matrix::scalar(-(i as f64))));
    assert_eq!(values(&longer), vec![1.0, 2.0, 3.0, -3.0, -4.0]);
}

#[test]
fn test_sum_and_mean() {
    let xs = scalars(&[1.0, 2.0, 6.0]);
    let total = sum(&xs).unwrap();
    let avg = mean(&xs).unwrap();
    assert_eq!(total.value().unwrap().scalar_value().unwrap(), 9.0);
    assert_eq!(avg.value().unwrap().scalar_value().unwrap(), 3.0);

    backward(&avg).unwrap();
    for x in &xs {
        check_matrix_near(&x.grad().unwrap().unwrap(), (1, 1), &[1.0 / 3.0], 1e-12);
    }
}

#[test]
fn test_sum_of_single_node_is_the_node() {
    let xs = scalars(&[4.0]);
    assert!(sum(&xs).unwrap().ptr_eq(&xs[0]));
}

#[test]
fn test_sum_and_mean_of_empty_list() {
    let empty: Vec<Node<f64>> = Vec::new();
    assert_eq!(
        sum(&empty).unwrap_err(),
        GradGraphError::EmptyNodeList {
            operation: "sum".to_string()
        }
    );
    assert_eq!(
        mean(&empty).unwrap_err(),
        GradGraphError::EmptyNodeList {
            operation: "mean".to_string()
        }
    );
}

#[test]
fn test_separate_vec() {
    let x = var_with_grad(Matrix::from_vec(vec![1.0f64, 2.0, 3.0]));
    let parts = separate_vec(&x).unwrap();
    assert_eq!(values(&parts), vec![1.0, 2.0, 3.0]);

    let weighted = prod_op(&parts[1], &parts[2]);
    backward(&weighted).unwrap();
    check_matrix_near(&x.grad().unwrap().unwrap(), (3, 1), &[0.0, 3.0, 2.0], 0.0);
}
