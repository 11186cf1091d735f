/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dense, row-major matrix views used to pass embedding populations around without
//! copying.
//!
//! A population of `n` embeddings of dimension `d` is a `n x d` matrix where each row is
//! one embedding. The pooled matrix used for clustering is built with [`vstack`].

use std::{
    fmt,
    ops::{Index, IndexMut},
};

#[cfg(feature = "rayon")]
use rayon::prelude::{IndexedParallelIterator, ParallelSlice, ParallelSliceMut};
use thiserror::Error;

/// Storage that can be viewed as a dense slice.
///
/// Implementations must return the same slice (same base, same length) on every call.
pub trait DenseData {
    type Elem;

    /// Return the underlying data as a slice.
    fn as_slice(&self) -> &[Self::Elem];
}

/// The mutable companion to [`DenseData`].
pub trait MutDenseData: DenseData {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem];
}

impl<T> DenseData for &[T] {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T> DenseData for &mut [T] {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T> MutDenseData for &mut [T] {
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T> DenseData for Box<[T]> {
    type Elem = T;
    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T> MutDenseData for Box<[T]> {
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

////////////
// Matrix //
////////////

/// A view over dense chunk of memory, interpreting that memory as a 2-dimensional matrix
/// laid out in row-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixBase<T>
where
    T: DenseData,
{
    data: T,
    nrows: usize,
    ncols: usize,
}

/// Represents an owning matrix in row-major order.
pub type Matrix<T> = MatrixBase<Box<[T]>>;

/// A borrowed, read-only matrix in row-major order.
pub type MatrixView<'a, T> = MatrixBase<&'a [T]>;

/// A borrowed, mutable matrix in row-major order.
pub type MutMatrixView<'a, T> = MatrixBase<&'a mut [T]>;

#[derive(Error)]
#[non_exhaustive]
#[error(
    "tried to construct a matrix view with {nrows} rows and {ncols} columns over a slice \
     of length {}", data.as_slice().len()
)]
pub struct TryFromError<T: DenseData> {
    data: T,
    nrows: usize,
    ncols: usize,
}

// Manually implement `fmt::Debug` so we don't require `T::Debug`.
impl<T: DenseData> fmt::Debug for TryFromError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryFromError")
            .field("data_len", &self.data.as_slice().len())
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .finish()
    }
}

impl<T: DenseData> TryFromError<T> {
    /// Consume the error and return the base data.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Clone> Matrix<T> {
    /// Construct a new matrix with every entry set to `value`.
    pub fn new(value: T, nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![value; nrows * ncols].into_boxed_slice(),
            nrows,
            ncols,
        }
    }
}

impl<T> Matrix<T> {
    /// Construct a matrix by calling `f(row, col)` for each entry in memory order.
    pub fn from_fn<F>(nrows: usize, ncols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let data: Box<[T]> = (0..nrows * ncols)
            .map(|i| f(i / ncols.max(1), i % ncols.max(1)))
            .collect();
        Self { data, nrows, ncols }
    }
}

impl<T> MatrixBase<T>
where
    T: DenseData,
{
    /// Try to construct a `MatrixBase` over the provided base. If the size of the base
    /// is incorrect, return a `TryFromError` containing the base.
    pub fn try_from(data: T, nrows: usize, ncols: usize) -> Result<Self, TryFromError<T>> {
        if data.as_slice().len() != nrows * ncols {
            Err(TryFromError { data, nrows, ncols })
        } else {
            Ok(Self { data, nrows, ncols })
        }
    }

    /// Return the number of columns in the matrix.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Return the number of rows in the matrix.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Return the underlying data as a slice.
    pub fn as_slice(&self) -> &[T::Elem] {
        self.data.as_slice()
    }

    /// Return the underlying data as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        self.data.as_mut_slice()
    }

    /// Return row `row` as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()`.
    pub fn row(&self, row: usize) -> &[T::Elem] {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        let start = row * self.ncols;
        &self.as_slice()[start..start + self.ncols]
    }

    /// Return row `row` as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.nrows()`.
    pub fn row_mut(&mut self, row: usize) -> &mut [T::Elem]
    where
        T: MutDenseData,
    {
        assert!(
            row < self.nrows(),
            "tried to access row {row} of a matrix with {} rows",
            self.nrows()
        );
        let ncols = self.ncols;
        let start = row * ncols;
        &mut self.as_mut_slice()[start..start + ncols]
    }

    /// Return a iterator over all rows in the matrix, beginning with row 0.
    pub fn row_iter(&self) -> impl ExactSizeIterator<Item = &[T::Elem]> {
        // `chunks_exact` rejects a zero chunk size, a zero-column matrix has no rows to
        // yield anyways.
        let ncols = self.ncols.max(1);
        let len = if self.ncols == 0 { 0 } else { self.as_slice().len() };
        self.as_slice()[..len].chunks_exact(ncols)
    }

    /// Return a mutable iterator over all rows in the matrix, beginning with row 0.
    pub fn row_iter_mut(&mut self) -> impl ExactSizeIterator<Item = &mut [T::Elem]>
    where
        T: MutDenseData,
    {
        let ncols = self.ncols.max(1);
        let len = if self.ncols == 0 { 0 } else { self.as_slice().len() };
        self.as_mut_slice()[..len].chunks_exact_mut(ncols)
    }

    /// Return an iterator that divides the matrix into sub-matrices with (up to)
    /// `batchsize` rows with `self.ncols()` columns.
    ///
    /// The last window has fewer than `batchsize` rows if the number of rows is not evenly
    /// divisible by `batchsize`.
    ///
    /// # Panics
    ///
    /// Panics if `batchsize = 0`.
    pub fn window_iter(&self, batchsize: usize) -> impl Iterator<Item = MatrixView<'_, T::Elem>> {
        assert!(batchsize != 0, "window_iter batchsize cannot be zero");
        let ncols = self.ncols();
        let nrows = self.nrows();
        (0..nrows).step_by(batchsize).map(move |start| {
            let stop = (start + batchsize).min(nrows);
            MatrixView {
                data: &self.as_slice()[start * ncols..stop * ncols],
                nrows: stop - start,
                ncols,
            }
        })
    }

    /// Return a parallel iterator over the rows of the matrix.
    #[cfg(feature = "rayon")]
    pub fn par_row_iter(&self) -> impl IndexedParallelIterator<Item = &[T::Elem]>
    where
        T::Elem: Sync,
    {
        self.as_slice().par_chunks_exact(self.ncols().max(1))
    }

    /// Return a parallel iterator over the mutable rows of the matrix.
    #[cfg(feature = "rayon")]
    pub fn par_row_iter_mut(&mut self) -> impl IndexedParallelIterator<Item = &mut [T::Elem]>
    where
        T: MutDenseData,
        T::Elem: Send,
    {
        let ncols = self.ncols().max(1);
        self.as_mut_slice().par_chunks_exact_mut(ncols)
    }

    /// Consume the matrix, returning the inner representation.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Return a view over the matrix.
    pub fn as_view(&self) -> MatrixView<'_, T::Elem> {
        MatrixBase {
            data: self.as_slice(),
            nrows: self.nrows(),
            ncols: self.ncols(),
        }
    }

    /// Return a mutable view over the matrix.
    pub fn as_mut_view(&mut self) -> MutMatrixView<'_, T::Elem>
    where
        T: MutDenseData,
    {
        let nrows = self.nrows();
        let ncols = self.ncols();
        MatrixBase {
            data: self.as_mut_slice(),
            nrows,
            ncols,
        }
    }

    /// Copy the contents into a new owning matrix.
    pub fn to_owned(&self) -> Matrix<T::Elem>
    where
        T::Elem: Clone,
    {
        Matrix {
            data: self.as_slice().into(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<'a, T> From<MatrixView<'a, T>> for &'a [T] {
    fn from(view: MatrixView<'a, T>) -> Self {
        view.data
    }
}

/// Return a reference to the item at entry `(row, col)` in the matrix.
///
/// # Panics
///
/// Panics if `row >= self.nrows()` or `col >= self.ncols()`.
impl<T> Index<(usize, usize)> for MatrixBase<T>
where
    T: DenseData,
{
    type Output = T::Elem;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(
            col < self.ncols(),
            "col {col} is out of bounds (max: {})",
            self.ncols()
        );
        &self.row(row)[col]
    }
}

impl<T> IndexMut<(usize, usize)> for MatrixBase<T>
where
    T: MutDenseData,
{
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        assert!(
            col < self.ncols(),
            "col {col} is out of bounds (max: {})",
            self.ncols()
        );
        &mut self.row_mut(row)[col]
    }
}

//////////////////////
// Row Manipulation //
//////////////////////

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot stack a matrix with {got} columns onto matrices with {expected} columns")]
pub struct ColumnMismatch {
    pub expected: usize,
    pub got: usize,
}

/// Concatenate the rows of `views` (in order) into a single owning matrix.
///
/// Returns an error if the views disagree on their number of columns. Stacking zero views
/// yields an empty `0 x 0` matrix.
pub fn vstack<T: Clone>(views: &[MatrixView<'_, T>]) -> Result<Matrix<T>, ColumnMismatch> {
    let ncols = views.first().map_or(0, |v| v.ncols());
    let mut nrows = 0;
    for view in views {
        if view.ncols() != ncols {
            return Err(ColumnMismatch {
                expected: ncols,
                got: view.ncols(),
            });
        }
        nrows += view.nrows();
    }

    let mut data = Vec::with_capacity(nrows * ncols);
    views
        .iter()
        .for_each(|view| data.extend_from_slice(view.as_slice()));

    Ok(Matrix {
        data: data.into_boxed_slice(),
        nrows,
        ncols,
    })
}

/// Materialize the rows of `view` listed in `indices` (in the order given).
///
/// # Panics
///
/// Panics if any index is out of bounds.
pub fn select_rows<T: Clone>(view: MatrixView<'_, T>, indices: &[usize]) -> Matrix<T> {
    let ncols = view.ncols();
    let mut data = Vec::with_capacity(indices.len() * ncols);
    indices
        .iter()
        .for_each(|&i| data.extend_from_slice(view.row(i)));
    Matrix {
        data: data.into_boxed_slice(),
        nrows: indices.len(),
        ncols,
    }
}

///////////
// Tests //
///////////
