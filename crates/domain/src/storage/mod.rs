//! Storage contracts implemented by the SeaORM adapter and by test doubles.

mod traits;

pub use traits::*;
