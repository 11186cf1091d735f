/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::fmt::{Display, Error, Formatter};

/// A `Display`-able closure that defers building a message until it is actually printed.
///
/// Used for assertion context and log messages that are expensive to format but rarely
/// shown, such as the per-restart context strings produced during clustering.
pub struct LazyString<F>(F)
where
    F: Fn(&mut Formatter<'_>) -> Result<(), Error>;

impl<F> LazyString<F>
where
    F: Fn(&mut Formatter<'_>) -> Result<(), Error>,
{
    /// Construct a new `LazyString` around the provided lambda.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Display for LazyString<F>
where
    F: Fn(&mut Formatter<'_>) -> Result<(), Error>,
{
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        (self.0)(f)
    }
}

/// Behaves like `format!` but returns a [`LazyString`] so formatting only happens when
/// the value is displayed.
#[macro_export]
macro_rules! lazy_format {
    ($($arg:tt)*) => {
        $crate::LazyString::new(|f: &mut std::fmt::Formatter<'_>| {
            write!(f, $($arg)*)
        })
    }
}
