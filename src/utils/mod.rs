//! Utility functions for the dot detector scaffolding
pub mod io;
pub mod nested;
pub mod print;

// Re-export commonly used utilities
pub use io::*;
pub use nested::NestedTensor;
pub use print::*;
