/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Shared building blocks for the MAUVE workspace: dense matrix views over embedding
//! populations and deferred message formatting.

pub mod views;
pub use views::{vstack, Matrix, MatrixView, MutMatrixView};

mod lazystring;
pub use lazystring::LazyString;
