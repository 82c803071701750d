pub mod bridge;
pub mod runtime;
