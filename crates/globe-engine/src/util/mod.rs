//! Small shared utilities: the single-assignment [`Future`], soft assertions
//! and poison-tolerant lock helpers.

mod assert;
mod future;
pub(crate) mod sync;

pub(crate) use assert::{soft_assert, soft_unwrap};
pub use future::Future;
