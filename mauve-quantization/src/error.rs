/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Formatting utilities for error chains.

/// Format the entire error chain for `err` by first calling `err.to_string()` and then
/// by walking the error's
/// [source tree](https://doc.rust-lang.org/std/error/trait.Error.html#method.source).
pub fn format<E>(err: &E) -> String
where
    E: std::error::Error + ?Sized,
{
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(current) = source {
        message.push_str("\n    caused by: ");
        message.push_str(&current.to_string());
        source = current.source();
    }
    message
}

///////////
// Tests //
///////////
