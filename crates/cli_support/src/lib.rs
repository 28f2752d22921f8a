pub mod common;

pub use common::{init_tracing, BackendKind, RunArgs};
