// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-construction helpers shared across the crate.

/// Wraps an [`crate::ErrorInt`] value into the public, cheaply-clonable [`crate::Error`].
macro_rules! wrap {
    ($e:expr) => {
        crate::Error(std::sync::Arc::new($e))
    };
}

/// Returns early with a wrapped error.
macro_rules! bail {
    ($e:expr) => {
        return Err(wrap!($e))
    };
}
