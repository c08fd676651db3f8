use crate::error::GradGraphError;
use crate::mat::element::Element;
use std::fmt;

/// Dense, row-major matrix of `rows x cols` elements.
///
/// Scalars are `1x1` matrices and vectors are column vectors (`n x 1`).
/// Cloning copies the data; the autograd layer shares values through `Arc`.
#[derive(Clone, PartialEq)]
pub struct Matrix<T: Element> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Creates a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `GradGraphError::DataLengthMismatch` if `data.len() != rows * cols`.
    pub fn new(data: Vec<T>, rows: usize, cols: usize) -> Result<Self, GradGraphError> {
        if data.len() != rows * cols {
            return Err(GradGraphError::DataLengthMismatch {
                data_len: data.len(),
                rows,
                cols,
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Creates a column vector holding `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Matrix {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Creates a `1x1` matrix.
    pub fn scalar(value: T) -> Self {
        Matrix {
            rows: 1,
            cols: 1,
            data: vec![value],
        }
    }

    pub fn full(rows: usize, cols: usize, value: T) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, T::zero())
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, T::one())
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.rows, self.cols)
    }

    pub fn ones_like(&self) -> Self {
        Self::ones(self.rows, self.cols)
    }

    /// Reassembles a matrix from a recycled buffer. The caller guarantees the length.
    pub(crate) fn from_parts(rows: usize, cols: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix { rows, cols, data }
    }

    pub(crate) fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn same_dims(&self, other: &Matrix<T>) -> bool {
        self.shape() == other.shape()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the element at row `i`, column `j`.
    pub fn at(&self, i: usize, j: usize) -> Result<T, GradGraphError> {
        if i >= self.rows || j >= self.cols {
            return Err(GradGraphError::IndexOutOfBounds {
                index: (i, j),
                shape: self.shape(),
            });
        }
        Ok(self.data[i * self.cols + j])
    }

    /// Returns the `i`-th element of a vector (or of the flattened data).
    pub fn at_vec(&self, i: usize) -> Result<T, GradGraphError> {
        self.data
            .get(i)
            .copied()
            .ok_or(GradGraphError::IndexOutOfBounds {
                index: (i, 0),
                shape: self.shape(),
            })
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<(), GradGraphError> {
        if i >= self.rows || j >= self.cols {
            return Err(GradGraphError::IndexOutOfBounds {
                index: (i, j),
                shape: self.shape(),
            });
        }
        self.data[i * self.cols + j] = value;
        Ok(())
    }

    /// Returns the single element of a `1x1` matrix.
    pub fn scalar_value(&self) -> Result<T, GradGraphError> {
        if !self.is_scalar() {
            return Err(GradGraphError::ShapeMismatch {
                expected: (1, 1),
                actual: self.shape(),
                operation: "scalar_value".to_string(),
            });
        }
        Ok(self.data[0])
    }

    fn check_same_dims(&self, other: &Matrix<T>, operation: &str) -> Result<(), GradGraphError> {
        if !self.same_dims(other) {
            return Err(GradGraphError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn zip_with<F>(&self, other: &Matrix<T>, operation: &str, f: F) -> Result<Self, GradGraphError>
    where
        F: Fn(T, T) -> T,
    {
        self.check_same_dims(other, operation)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix::from_parts(self.rows, self.cols, data))
    }

    fn zip_in_place<F>(&mut self, other: &Matrix<T>, operation: &str, f: F) -> Result<(), GradGraphError>
    where
        F: Fn(&mut T, T),
    {
        self.check_same_dims(other, operation)?;
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, &b)| f(a, b));
        Ok(())
    }

    pub fn add(&self, other: &Matrix<T>) -> Result<Self, GradGraphError> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix<T>) -> Result<Self, GradGraphError> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn prod(&self, other: &Matrix<T>) -> Result<Self, GradGraphError> {
        self.zip_with(other, "prod", |a, b| a * b)
    }

    /// Element-wise division.
    pub fn div(&self, other: &Matrix<T>) -> Result<Self, GradGraphError> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    pub fn add_in_place(&mut self, other: &Matrix<T>) -> Result<(), GradGraphError> {
        self.zip_in_place(other, "add_in_place", |a, b| *a = *a + b)
    }

    pub fn sub_in_place(&mut self, other: &Matrix<T>) -> Result<(), GradGraphError> {
        self.zip_in_place(other, "sub_in_place", |a, b| *a = *a - b)
    }

    pub fn prod_in_place(&mut self, other: &Matrix<T>) -> Result<(), GradGraphError> {
        self.zip_in_place(other, "prod_in_place", |a, b| *a = *a * b)
    }

    pub fn add_scalar(&self, k: T) -> Self {
        self.apply(|v| v + k)
    }

    pub fn prod_scalar(&self, k: T) -> Self {
        self.apply(|v| v * k)
    }

    pub fn prod_scalar_in_place(&mut self, k: T) -> &mut Self {
        self.data.iter_mut().for_each(|v| *v = *v * k);
        self
    }

    /// Matrix product `self · other`.
    pub fn mat_mul(&self, other: &Matrix<T>) -> Result<Self, GradGraphError> {
        if self.cols != other.rows {
            return Err(GradGraphError::ShapeMismatch {
                expected: (self.cols, other.cols),
                actual: other.shape(),
                operation: "mat_mul".to_string(),
            });
        }
        let mut out = vec![T::zero(); self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                let row = &other.data[k * other.cols..(k + 1) * other.cols];
                let dst = &mut out[i * other.cols..(i + 1) * other.cols];
                dst.iter_mut().zip(row).for_each(|(d, &b)| *d = *d + a * b);
            }
        }
        Ok(Matrix::from_parts(self.rows, other.cols, out))
    }

    /// Transpose.
    pub fn t(&self) -> Self {
        let mut out = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                out.push(self.data[i * self.cols + j]);
            }
        }
        Matrix::from_parts(self.cols, self.rows, out)
    }

    pub fn pow(&self, power: T) -> Self {
        self.apply(|v| v.powf(power))
    }

    /// Returns a new matrix with `f` applied to every element.
    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Self {
        Matrix::from_parts(self.rows, self.cols, self.data.iter().map(|&v| f(v)).collect())
    }

    /// Sum of all elements as a `1x1` matrix.
    pub fn sum(&self) -> Self {
        Matrix::scalar(self.data.iter().copied().sum())
    }
}

impl<T: Element> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix({}x{}) {:?}", self.rows, self.cols, self.data)
    }
}

impl<T: Element> approx::AbsDiffEq for Matrix<T> {
    type Epsilon = T;

    fn default_epsilon() -> T {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: T) -> bool {
        self.same_dims(other)
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl<T: Element> approx::RelativeEq for Matrix<T> {
    fn default_max_relative() -> T {
        T::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: T, max_relative: T) -> bool {
        self.same_dims(other)
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

#[cfg(test)]
#[path = "matrix_test.rs"]
mod tests;
