use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// A dense f32 tensor.
///
/// Decoding only ever deals with `[N, V]` logit matrices, one row per
/// hypothesis, so most accessors assume a 2D shape and return an error
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Shape,
}

impl Tensor {
    /// Create a new tensor from f32 data and a shape.
    pub fn new(data: Vec<f32>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                len: data.len(),
                shape: shape.dims().to_vec(),
                numel: shape.numel(),
            });
        }
        Ok(Tensor { data, shape })
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the underlying data as an f32 slice.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of columns of a 2D tensor.
    pub fn cols(&self) -> Result<usize> {
        Ok(self.shape.as_matrix()?.1)
    }

    /// Borrow row `i` of a 2D tensor.
    pub fn row(&self, i: usize) -> Result<&[f32]> {
        let (rows, cols) = self.shape.as_matrix()?;
        if i >= rows {
            return Err(TensorError::RowOutOfRange { row: i, rows });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Apply a backend op to the flat data, keeping the shape.
    pub fn map_data<F>(&self, f: F) -> Result<Tensor>
    where
        F: FnOnce(&[f32]) -> Result<Vec<f32>>,
    {
        Tensor::new(f(&self.data)?, self.shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tensor() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Shape::matrix(2, 3)).unwrap();
        assert_eq!(t.shape().as_matrix().unwrap(), (2, 3));
        assert_eq!(t.cols().unwrap(), 3);
        assert_eq!(t.row(1).unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_new_length_mismatch() {
        let err = Tensor::new(vec![1.0, 2.0], Shape::matrix(1, 3)).unwrap_err();
        assert!(matches!(err, TensorError::DataLength { len: 2, numel: 3, .. }));
    }

    #[test]
    fn test_row_out_of_range() {
        let t = Tensor::new(vec![0.0; 4], Shape::matrix(1, 4)).unwrap();
        assert_eq!(t.row(1), Err(TensorError::RowOutOfRange { row: 1, rows: 1 }));
    }

    #[test]
    fn test_row_on_vector_fails() {
        let t = Tensor::new(vec![1.0; 4], Shape::new(vec![4])).unwrap();
        assert!(t.row(0).is_err());
    }
}
