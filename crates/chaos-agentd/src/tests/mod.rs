//! Test suites for the chaos agent lifecycle.

pub(crate) mod support;
