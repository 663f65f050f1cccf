/*
 * Copyright 2019-2020 Wren Powell
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! `historized-fs` is a file system layer which keeps the history and version of every file.
//!
//! This crate wraps any storage backend which implements [`DataStore`] and adds the following
//! features on top of it:
//! - Before a file is overwritten, appended to, or deleted, its old contents are archived into a
//! history directory beside it.
//! - Only the newest history entries of each file are kept.
//! - Every file has a version number which is incremented on each change, and writes can be
//! guarded so that they only succeed if nobody else changed the file in the meantime.
//!
//! The history and version directories live in the backend like any other directory, so no
//! separate database is needed and the backend can be inspected by hand.
//!
//! The following data stores are provided out of the box:
//! - `DirectoryStore` stores files in a directory in the local file system.
//! - `MemoryStore` stores files in memory.
//!
//! # Examples
//! ```
//! use std::time::SystemTime;
//!
//! use historized_fs::history::{HistoryConfig, HistoryFs};
//! use historized_fs::store::{MemoryStore, Node, NodeExt};
//!
//! fn main() -> historized_fs::Result<()> {
//!     // Create a file system with the default configuration that stores files in memory.
//!     let fs = HistoryFs::new(MemoryStore::new(), HistoryConfig::default())?;
//!
//!     let file = fs.create_by_path("/notes/todo.txt")?;
//!     file.parent().unwrap().mkdirs()?;
//!
//!     // The first write creates the file at version 1.
//!     file.write_string(false, "buy milk")?;
//!     assert_eq!(file.version(false)?, 1);
//!
//!     // Overwriting it archives the old contents.
//!     file.write_string(false, "buy bread")?;
//!     assert_eq!(file.version(false)?, 2);
//!     assert_eq!(file.history_times()?.len(), 1);
//!
//!     // A guarded write fails if the version moved on.
//!     assert!(file.write_string_for_version("buy eggs", 2).is_err());
//!     file.write_string_for_version("buy eggs", 3)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//! Some functionality is gated behind cargo features:
//!
//! Type | Cargo Feature
//! --- | ---
//! `DirectoryStore` | `store-directory`
//!
//! The `store-directory` feature is enabled by default.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use error::{Error, Result};

pub mod clock;
mod error;
pub mod history;
pub mod store;
