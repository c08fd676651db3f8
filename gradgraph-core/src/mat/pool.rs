use crate::mat::element::Element;
use crate::mat::matrix::Matrix;
use crate::utils::sync::lock_or_recover;
use std::fmt;
use std::sync::Mutex;

/// One size class per possible bit length of an element count (0..=64).
const SIZE_CLASSES: usize = usize::BITS as usize + 1;

/// Buffers kept per size class before released ones are simply dropped.
const DEFAULT_BUCKET_CAPACITY: usize = 64;

/// Recycles matrix buffers by size class.
///
/// A request for `n` elements is served from class `bit_len(n)`, whose buffers
/// all have a capacity of at least `2^bit_len(n) - 1`. Each class has its own
/// lock, so concurrent `get`/`release` on different sizes never contend.
pub struct MatrixPool<T: Element> {
    buckets: Vec<Mutex<Vec<Vec<T>>>>,
    bucket_capacity: usize,
}

impl<T: Element> MatrixPool<T> {
    pub fn new() -> Self {
        Self::with_bucket_capacity(DEFAULT_BUCKET_CAPACITY)
    }

    /// Creates a pool that retains at most `bucket_capacity` buffers per size class.
    pub fn with_bucket_capacity(bucket_capacity: usize) -> Self {
        MatrixPool {
            buckets: (0..SIZE_CLASSES).map(|_| Mutex::new(Vec::new())).collect(),
            bucket_capacity,
        }
    }

    fn size_class(len: usize) -> usize {
        (usize::BITS - len.leading_zeros()) as usize
    }

    /// Largest class whose guaranteed capacity fits into `capacity`.
    fn class_for_capacity(capacity: usize) -> usize {
        Self::size_class(capacity.saturating_add(1)) - 1
    }

    fn take_buffer(&self, len: usize) -> Vec<T> {
        let class = Self::size_class(len);
        let recycled = lock_or_recover(&self.buckets[class], "matrix pool bucket").pop();
        match recycled {
            Some(mut buffer) => {
                if buffer.len() > len {
                    buffer.truncate(len);
                } else {
                    buffer.resize(len, T::zero());
                }
                buffer
            }
            None => {
                let capacity = if class < usize::BITS as usize {
                    (1usize << class) - 1
                } else {
                    len
                };
                let mut buffer = Vec::with_capacity(capacity);
                buffer.resize(len, T::zero());
                buffer
            }
        }
    }

    /// Returns a `rows x cols` matrix backed by a recycled buffer.
    ///
    /// The contents are unspecified: recycled buffers keep their old values.
    /// Use [`get_empty`](Self::get_empty) when zeros are needed.
    pub fn get(&self, rows: usize, cols: usize) -> Matrix<T> {
        Matrix::from_parts(rows, cols, self.take_buffer(rows * cols))
    }

    /// Returns a zero-filled `rows x cols` matrix.
    pub fn get_empty(&self, rows: usize, cols: usize) -> Matrix<T> {
        let mut buffer = self.take_buffer(rows * cols);
        buffer.iter_mut().for_each(|v| *v = T::zero());
        Matrix::from_parts(rows, cols, buffer)
    }

    /// Returns a pooled copy of `src`.
    pub fn get_copy(&self, src: &Matrix<T>) -> Matrix<T> {
        let mut copy = self.get(src.rows(), src.cols());
        copy.data_mut().copy_from_slice(src.data());
        copy
    }

    /// Hands the buffer of `matrix` back to the pool.
    pub fn release(&self, matrix: Matrix<T>) {
        let buffer = matrix.into_data();
        if buffer.capacity() == 0 {
            return;
        }
        let class = Self::class_for_capacity(buffer.capacity());
        let mut bucket = lock_or_recover(&self.buckets[class], "matrix pool bucket");
        if bucket.len() < self.bucket_capacity {
            bucket.push(buffer);
        }
    }

    /// Number of buffers currently held by the pool.
    pub fn pooled(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| lock_or_recover(bucket, "matrix pool bucket").len())
            .sum()
    }
}

impl<T: Element> Default for MatrixPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Debug for MatrixPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixPool")
            .field("pooled", &self.pooled())
            .field("bucket_capacity", &self.bucket_capacity)
            .finish()
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
