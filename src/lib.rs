#![warn(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod classifier;
pub mod dates;
pub mod error;
pub mod filter;
pub mod identity;
pub mod normalize;
pub mod session;
pub mod table;
pub mod workbook;
