#![doc = include_str!("../README.md")]
#![recursion_limit = "1024"]

mod compression;
pub mod config;
pub(crate) mod crypt;
pub mod db;
pub mod error;
pub(crate) mod format;
mod hashed_block_stream;
mod io;
pub mod key;
pub(crate) mod xml_db;

pub use self::db::*;
pub use self::key::DatabaseKey;

// see https://gist.github.com/msmuenchen/9318327 for background on the outer container
// shape this crate's [`format::kdbx4`] module implements.
