//! Part tracking core for test frameworks that re-execute a test case body
//! once per leaf path through its nested sections and generators.
//!
//! The test body is straight-line code that cannot be rewound, so the host
//! runs it repeatedly; on each run the tracker decides which nested region to
//! enter, which to skip, and when the whole test case is finished.

pub mod context;
pub mod driver;
pub mod error;
pub mod logging;
pub mod part;
pub mod snapshot;
pub mod state;
pub mod test_support;
