use super::*;
use crate::autograd::function::Function;
use crate::autograd::operator::Operator;
use crate::ops::arithmetic::prod_op;

/// x * x with a backward that forgets the factor 2.
#[derive(Debug)]
struct WrongSquare {
    x: Node<f64>,
}

impl Function<f64> for WrongSquare {
    fn operands(&self) -> Vec<Node<f64>> {
        vec![self.x.clone()]
    }

    fn forward(&self) -> Result<Matrix<f64>, GradGraphError> {
        let x = self.x.value()?;
        x.prod(&x)
    }

    fn backward(&self, grad_output: &Matrix<f64>) -> Result<(), GradGraphError> {
        let x = self.x.value()?;
        self.x.acc_grad(&grad_output.prod(&x)?)
    }
}

#[test]
fn test_check_grad_accepts_correct_gradient() {
    let a = Matrix::new(vec![1.0f64, -2.0, 3.0, 0.5], 2, 2).unwrap();
    let b = Matrix::new(vec![0.5f64, 4.0, -1.0, 2.0], 2, 2).unwrap();
    let result = check_grad(
        |inputs| Ok(prod_op(&inputs[0], &inputs[1])),
        &[a, b],
        &Matrix::ones(2, 2),
        1e-6,
        1e-6,
    );
    assert_eq!(result, Ok(()));
}

#[test]
fn test_check_grad_reports_mismatch() {
    let x = Matrix::from_vec(vec![3.0f64]);
    let result = check_grad(
        |inputs| Ok(Operator::new(WrongSquare { x: inputs[0].clone() }).into_node()),
        &[x],
        &Matrix::scalar(1.0),
        1e-6,
        1e-4,
    );
    match result {
        Err(GradCheckError::GradientMismatch {
            input_index,
            element_index,
            analytical_grad,
            numerical_grad,
            ..
        }) => {
            assert_eq!((input_index, element_index), (0, 0));
            approx::assert_relative_eq!(analytical_grad, 3.0);
            approx::assert_relative_eq!(numerical_grad, 6.0, epsilon = 1e-4);
        }
        other => panic!("Expected GradientMismatch, got {:?}", other),
    }
}

#[test]
fn test_check_grad_reports_forward_failure() {
    let result = check_grad(
        |inputs| Ok(prod_op(&inputs[0], &inputs[1])),
        &[Matrix::<f64>::zeros(2, 2), Matrix::zeros(3, 1)],
        &Matrix::ones(2, 2),
        1e-6,
        1e-6,
    );
    assert!(matches!(result, Err(GradCheckError::BackwardPassError(_))));
}

#[test]
fn test_check_grad_requires_grad_propagation() {
    let result = check_grad(
        |_| Ok(crate::autograd::variable::scalar(1.0f64)),
        &[Matrix::scalar(2.0)],
        &Matrix::scalar(1.0),
        1e-6,
        1e-6,
    );
    assert_eq!(result, Err(GradCheckError::RequiresGradPropagationError));
}
