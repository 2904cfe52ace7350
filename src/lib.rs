pub use trove_core::*;
