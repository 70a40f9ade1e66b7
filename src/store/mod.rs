// SPDX-License-Identifier: MIT

//! Persistence layer: flat per-user JSON records under a data directory.

pub mod file;

pub use file::FileStore;
