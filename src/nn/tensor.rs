use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 2-D row-major tensor. Clones share the underlying buffer; use
/// `deep_clone` for an independent copy.
pub struct Tensor {
    pub data: Arc<RwLock<Vec<f32>>>,
    rows: usize,
    cols: usize,
}

impl Tensor {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(vec![0.0; rows * cols])),
            rows,
            cols,
        }
    }

    /// Standard-normal initialization, used for fresh layer weights.
    pub fn randn(rows: usize, cols: usize) -> Self {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let data: Vec<f32> = (0..rows * cols)
            .map(|_| normal.sample(&mut rand::rng()))
            .collect();

        Self {
            data: Arc::new(RwLock::new(data)),
            rows,
            cols,
        }
    }

    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols, "data length must match dimensions");
        Self {
            data: Arc::new(RwLock::new(data)),
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.data.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.data.write().unwrap()
    }

    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.cols, other.rows,
            "self columns must equal other rows"
        );

        let k = self.cols;
        let n = other.cols;
        let result = Tensor::zeros(self.rows, n);

        let a_data = self.read();
        let b_data = other.read();

        {
            let mut c_guard = result.write();
            let c_slice: &mut [f32] = &mut c_guard;

            // one output row per rayon task
            c_slice.par_chunks_mut(n).enumerate().for_each(|(i, c_row)| {
                for l in 0..k {
                    let a_val = a_data[i * k + l];
                    let b_row = &b_data[l * n..(l + 1) * n];
                    for j in 0..n {
                        c_row[j] += a_val * b_row[j];
                    }
                }
            });
        }

        result
    }

    /// Materialized transpose; the copy keeps indexing row-major everywhere.
    pub fn transpose(&self) -> Tensor {
        let data = self.read();
        let mut out = vec![0.0; self.rows * self.cols];

        for i in 0..self.rows {
            for j in 0..self.cols {
                out[j * self.rows + i] = data[i * self.cols + j];
            }
        }

        Tensor::from_vec(out, self.cols, self.rows)
    }

    /// Column sums as a 1 x cols tensor.
    pub fn sum_rows(&self) -> Tensor {
        let data = self.read();
        let cols = self.cols;

        let sums = data
            .par_chunks(cols)
            .map(|row| row.to_vec())
            .reduce(
                || vec![0.0; cols],
                |mut acc, row| {
                    for j in 0..cols {
                        acc[j] += row[j];
                    }
                    acc
                },
            );

        Tensor::from_vec(sums, 1, cols)
    }

    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        let data = self.read();
        let mapped: Vec<f32> = data.par_iter().map(|&x| f(x)).collect();
        Tensor::from_vec(mapped, self.rows, self.cols)
    }

    pub fn map2<F>(&self, other: &Tensor, f: F) -> Tensor
    where
        F: Fn(f32, f32) -> f32 + Sync + Send,
    {
        assert_eq!(self.rows, other.rows, "tensors must have the same shape");
        assert_eq!(self.cols, other.cols, "tensors must have the same shape");

        let a = self.read();
        let b = other.read();
        let mapped: Vec<f32> = a
            .par_iter()
            .zip(b.par_iter())
            .map(|(&x, &y)| f(x, y))
            .collect();
        Tensor::from_vec(mapped, self.rows, self.cols)
    }

    pub fn deep_clone(&self) -> Tensor {
        Tensor::from_vec(self.read().clone(), self.rows, self.cols)
    }
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        if self.rows != other.rows || self.cols != other.cols {
            return false;
        }
        *self.read() == *other.read()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("data", &*self.read())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct TensorRecord {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Serialize for Tensor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let record = TensorRecord {
            rows: self.rows,
            cols: self.cols,
            data: self.read().clone(),
        };
        record.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tensor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = TensorRecord::deserialize(deserializer)?;
        Ok(Tensor::from_vec(record.data, record.rows, record.cols))
    }
}
