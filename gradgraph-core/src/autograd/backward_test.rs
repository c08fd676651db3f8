use super::*;
use crate::autograd::function::Function;
use crate::autograd::operator::Operator;
use crate::autograd::variable::{var, var_with_grad};
use crate::ops::arithmetic::{add_op, prod_op};
use crate::ops::math_elem::pow_op;
use crate::utils::testing::check_matrix_near;
use approx::assert_relative_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity function counting its backward calls, optionally failing them.
#[derive(Debug)]
struct Probe {
    x: Node<f64>,
    backward_calls: Arc<AtomicUsize>,
    fail: bool,
}

impl Probe {
    fn node(x: &Node<f64>, fail: bool) -> (Node<f64>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Probe {
            x: x.clone(),
            backward_calls: Arc::clone(&calls),
            fail,
        };
        (Operator::new(probe).into_node(), calls)
    }
}

impl Function<f64> for Probe {
    fn operands(&self) -> Vec<Node<f64>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<f64>, GradGraphError> {
        Ok((*self.x.value()?).clone())
    }

    fn backward(&self, grad_output: &Matrix<f64>) -> Result<(), GradGraphError> {
        self.backward_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GradGraphError::InternalError("probe failure".to_string()));
        }
        self.x.acc_grad(grad_output)
    }
}

#[test]
fn test_add_scenario() {
    let x1 = var_with_grad(Matrix::scalar(1.0f64));
    let x2 = var_with_grad(Matrix::scalar(2.0f64));
    let y = add_op(&x1, &x2);

    assert_eq!(*y.value().unwrap(), Matrix::scalar(3.0));
    backward(&y).unwrap();

    assert_eq!(y.grad().unwrap(), Some(Matrix::scalar(1.0)));
    assert_eq!(x1.grad().unwrap(), Some(Matrix::scalar(1.0)));
    assert_eq!(x2.grad().unwrap(), Some(Matrix::scalar(1.0)));
}

#[test]
fn test_pow_scenario() {
    let x = var_with_grad(Matrix::from_vec(vec![0.1f32, 0.2, 0.3, 0.0]));
    let y = pow_op(&x, 3.0);

    check_matrix_near(&y.value().unwrap(), (4, 1), &[0.001, 0.008, 0.027, 0.0], 1e-6);
    backward_with_grad(&y, &Matrix::from_vec(vec![1.0, 1.0, 1.0, 1.0])).unwrap();
    check_matrix_near(&x.grad().unwrap().unwrap(), (4, 1), &[0.03, 0.12, 0.27, 0.0], 1e-6);
}

#[test]
fn test_diamond_runs_shared_backward_once() {
    let x = var_with_grad(Matrix::scalar(3.0f64));
    let (shared, calls) = Probe::node(&x, false);
    let left = prod_op(&shared, &shared);
    let right = add_op(&shared, &x);
    let out = add_op(&left, &right);

    assert_relative_eq!(out.value().unwrap().scalar_value().unwrap(), 15.0);
    backward(&out).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // d/dx (x^2 + 2x) = 2x + 2
    assert_relative_eq!(x.grad().unwrap().unwrap().scalar_value().unwrap(), 8.0);
    // Every path into `shared` accumulated before it propagated.
    assert_relative_eq!(shared.grad().unwrap().unwrap().scalar_value().unwrap(), 7.0);
}

#[test]
fn test_repeated_operand() {
    let x = var_with_grad(Matrix::scalar(2.0f64));
    let op1 = add_op(&x, &x);
    let op2 = add_op(&op1, &op1);
    backward(&op2).unwrap();
    assert_eq!(op1.grad().unwrap(), Some(Matrix::scalar(2.0)));
    assert_eq!(x.grad().unwrap(), Some(Matrix::scalar(4.0)));
}

#[test]
fn test_backward_many_shares_graph() {
    let x = var_with_grad(Matrix::scalar(2.0f64));
    let (shared, calls) = Probe::node(&x, false);
    let y1 = prod_op(&shared, &x);
    let y2 = add_op(&shared, &shared);

    backward_many(&[y1, y2]).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // y1 = x^2, y2 = 2x
    assert_relative_eq!(x.grad().unwrap().unwrap().scalar_value().unwrap(), 6.0);
}

#[test]
fn test_backward_many_with_dependent_roots() {
    let x = var_with_grad(Matrix::scalar(2.0f64));
    let inner = prod_op(&x, &x);
    let outer = add_op(&inner, &x);

    backward_many(&[inner.clone(), outer]).unwrap();
    assert_eq!(inner.grad().unwrap(), Some(Matrix::scalar(2.0)));
    assert_eq!(x.grad().unwrap(), Some(Matrix::scalar(9.0)));
}

#[test]
fn test_backward_from_variable_root() {
    let x: Node<f64> = var_with_grad(Matrix::zeros(2, 3));
    backward(&x).unwrap();
    assert_eq!(x.grad().unwrap(), Some(Matrix::ones(2, 3)));
}

#[test]
fn test_backward_without_requires_grad_is_a_no_op() {
    let a = var(Matrix::scalar(1.0f64));
    let b = var(Matrix::scalar(2.0f64));
    let y = add_op(&a, &b);
    backward(&y).unwrap();
    assert!(!y.has_grad());
    assert!(!a.has_grad());
    assert!(!b.has_grad());
}

#[test]
fn test_constant_branch_is_not_propagated() {
    let x = var_with_grad(Matrix::scalar(2.0f64));
    let c = var(Matrix::scalar(5.0f64));
    let (constant, calls) = Probe::node(&c, false);
    let y = prod_op(&x, &constant);

    backward(&y).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(x.grad().unwrap(), Some(Matrix::scalar(5.0)));
}

#[test]
fn test_backward_with_grad_checks_seed_shape() {
    let x: Node<f64> = var_with_grad(Matrix::zeros(2, 2));
    let y = add_op(&x, &x);
    let err = backward_with_grad(&y, &Matrix::ones(3, 1)).unwrap_err();
    assert!(matches!(
        err,
        GradGraphError::ShapeMismatch { expected: (2, 2), actual: (3, 1), .. }
    ));
    assert!(!y.has_grad());
}

#[test]
fn test_failing_backward_step_is_reported() {
    let x = var_with_grad(Matrix::scalar(1.0f64));
    let (failing, _) = Probe::node(&x, true);
    let y = add_op(&failing, &failing);

    let err = backward(&y).unwrap_err();
    assert_eq!(err, GradGraphError::InternalError("probe failure".to_string()));
    assert!(!x.has_grad());
}

#[test]
fn test_forward_failure_is_reported() {
    let x: Node<f64> = var_with_grad(Matrix::zeros(2, 2));
    let z = var_with_grad(Matrix::zeros(3, 3));
    let y = add_op(&x, &z);
    assert!(matches!(
        backward(&y),
        Err(GradGraphError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_backward_waits_for_concurrent_forward() {
    let x = var_with_grad(Matrix::scalar(2.0f64));
    let slow = Operator::new(SlowSquare { x: x.clone() }).into_node();
    slow.spawn_forward();
    backward(&slow).unwrap();
    assert_eq!(x.grad().unwrap(), Some(Matrix::scalar(4.0)));
}

#[derive(Debug)]
struct SlowSquare {
    x: Node<f64>,
}

impl Function<f64> for SlowSquare {
    fn operands(&self) -> Vec<Node<f64>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<f64>, GradGraphError> {
        std::thread::sleep(Duration::from_millis(20));
        let x = self.x.value()?;
        x.prod(&x)
    }

    fn backward(&self, grad_output: &Matrix<f64>) -> Result<(), GradGraphError> {
        let x = self.x.value()?;
        self.x.acc_grad(&grad_output.prod(&x.prod_scalar(2.0))?)
    }
}

/// h1 = h0 * w + x1 at step 1, h2 = h1 * w + x2 at step 2.
fn unrolled(tsh: &Arc<TimeStepHandler>) -> [Node<f64>; 6] {
    let _scope = tsh.enter();
    let w = var_with_grad(Matrix::scalar(2.0));
    let h0 = var_with_grad(Matrix::scalar(1.0));

    tsh.inc_time_step();
    let x1 = var_with_grad(Matrix::scalar(3.0));
    let h1 = add_op(&prod_op(&h0, &w), &x1);

    tsh.inc_time_step();
    let x2 = var_with_grad(Matrix::scalar(4.0));
    let h2 = add_op(&prod_op(&h1, &w), &x2);

    [w, h0, x1, h1, x2, h2]
}

#[test]
fn test_backward_truncated() {
    let tsh = Arc::new(TimeStepHandler::new());
    let [w, h0, x1, h1, x2, h2] = unrolled(&tsh);

    backward_truncated(std::slice::from_ref(&h2), &tsh, 2).unwrap();

    assert_eq!(x2.grad().unwrap(), Some(Matrix::scalar(1.0)));
    assert_eq!(w.grad().unwrap(), Some(Matrix::scalar(5.0)));
    // The step-1 state receives its gradient but keeps it.
    assert_eq!(h1.grad().unwrap(), Some(Matrix::scalar(2.0)));
    assert!(!x1.has_grad());
    assert!(!h0.has_grad());
}

#[test]
fn test_backward_truncated_from_first_step_is_full() {
    let tsh = Arc::new(TimeStepHandler::new());
    let [w, h0, x1, _h1, x2, h2] = unrolled(&tsh);

    backward_truncated(std::slice::from_ref(&h2), &tsh, 0).unwrap();

    assert_eq!(x2.grad().unwrap(), Some(Matrix::scalar(1.0)));
    assert_eq!(x1.grad().unwrap(), Some(Matrix::scalar(2.0)));
    assert_eq!(h0.grad().unwrap(), Some(Matrix::scalar(4.0)));
    // d(h2)/dw = h1 + w * h0
    assert_eq!(w.grad().unwrap(), Some(Matrix::scalar(7.0)));
}
