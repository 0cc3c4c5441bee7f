#![doc = include_str!("../README.md")]

pub mod tree;

#[cfg(feature = "proptest")]
pub mod strategies;

pub use tree::iter::{IntoIter, Iter};
pub use tree::{StepLengthError, TreeList};
