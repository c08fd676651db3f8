use crate::autograd::backward::backward_with_grad;
use crate::autograd::node::Node;
use crate::autograd::release::release_graph;
use crate::autograd::variable::{var, var_with_grad};
use crate::error::GradGraphError;
use crate::mat::{Element, Matrix};
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}, element {element_index}: analytical grad {analytical_grad:?} != numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(GradGraphError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(GradGraphError),
    #[error("Matrix error during intermediate calculation: {0}")]
    MatrixError(GradGraphError),
    #[error("Input {input_index} has no gradient after the backward pass.")]
    MissingAnalyticalGrad { input_index: usize },
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index}. Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for input {input_index}, element {element_index}. Value: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
    #[error("Function output does not require grad although its inputs do.")]
    RequiresGradPropagationError,
}

impl From<GradGraphError> for GradCheckError {
    fn from(err: GradGraphError) -> Self {
        GradCheckError::MatrixError(err)
    }
}

/// Checks analytical gradients against central finite differences.
///
/// `func` builds a graph from one variable per entry of `inputs`. The
/// analytical gradients come from a backward pass seeded with `output_grad`;
/// the numerical ones differentiate the loss `sum(output * output_grad)`.
/// An element passes when the absolute or the relative difference is within
/// `tolerance`.
pub fn check_grad<T, F>(
    func: F,
    inputs: &[Matrix<T>],
    output_grad: &Matrix<T>,
    epsilon: T,
    tolerance: T,
) -> Result<(), GradCheckError>
where
    T: Element,
    F: Fn(&[Node<T>]) -> Result<Node<T>, GradGraphError>,
{
    let nodes: Vec<Node<T>> = inputs.iter().cloned().map(var_with_grad).collect();
    let output = func(&nodes).map_err(GradCheckError::ForwardPassError)?;
    if !output.requires_grad() {
        return Err(GradCheckError::RequiresGradPropagationError);
    }
    backward_with_grad(&output, output_grad).map_err(GradCheckError::BackwardPassError)?;
    release_graph(std::slice::from_ref(&output));

    let epsilon_f = to_f64(epsilon);
    let tolerance_f = to_f64(tolerance);

    for (i, node) in nodes.iter().enumerate() {
        let analytical = node
            .grad()?
            .ok_or(GradCheckError::MissingAnalyticalGrad { input_index: i })?;

        for j in 0..inputs[i].size() {
            let loss_plus = perturbed_loss(&func, inputs, i, j, epsilon, output_grad)?;
            let loss_minus = perturbed_loss(&func, inputs, i, j, -epsilon, output_grad)?;
            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon_f);
            let analytical_grad = to_f64(analytical.data()[j]);

            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index: i,
                    element_index: j,
                    loss_plus,
                    loss_minus,
                });
            }
            if !analytical_grad.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    input_index: i,
                    element_index: j,
                    value: analytical_grad,
                });
            }

            let difference = (analytical_grad - numerical_grad).abs();
            if difference > tolerance_f
                && difference / (analytical_grad.abs() + epsilon_f) > tolerance_f
            {
                return Err(GradCheckError::GradientMismatch {
                    input_index: i,
                    element_index: j,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }
    Ok(())
}

fn to_f64<T: Element>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// Loss with element `element` of input `input` shifted by `delta`.
fn perturbed_loss<T, F>(
    func: &F,
    inputs: &[Matrix<T>],
    input: usize,
    element: usize,
    delta: T,
    output_grad: &Matrix<T>,
) -> Result<f64, GradCheckError>
where
    T: Element,
    F: Fn(&[Node<T>]) -> Result<Node<T>, GradGraphError>,
{
    let nodes: Vec<Node<T>> = inputs
        .iter()
        .enumerate()
        .map(|(k, m)| {
            let mut m = m.clone();
            if k == input {
                let v = &mut m.data_mut()[element];
                *v = *v + delta;
            }
            var(m)
        })
        .collect();
    let output = func(&nodes).map_err(GradCheckError::ForwardPassError)?;
    let loss = output
        .value()
        .map_err(GradCheckError::ForwardPassError)?
        .prod(output_grad)?
        .sum()
        .scalar_value()?;
    release_graph(std::slice::from_ref(&output));
    Ok(to_f64(loss))
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
