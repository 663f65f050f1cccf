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

//! A file system layer which keeps the history and versions of files.
//!
//! [`HistoryFs`] wraps a [`DataStore`] and hands out [`HistoryNode`] handles. Before a file is
//! overwritten, appended to, or deleted through one of these handles, its old contents are
//! archived into a history directory beside it. Each entry is named after the file and the time
//! it was archived, and only the newest entries are kept.
//!
//! Every file also has a version number which is incremented on each change. Versions greater
//! than one are recorded in a version directory beside the file, which makes optimistic
//! concurrency possible through the `*_for_version` methods of [`Node`].
//!
//! ```text
//! docs/
//! ├── report.txt
//! ├── ~history/
//! │   ├── report_20140217165551132.txt
//! │   └── report_20140218090000000.txt
//! └── ~version/
//!     └── report.txt        (contains "3")
//! ```
//!
//! The history and version directories are hidden when listing a directory, and their names
//! can't be used for other files.
//!
//! [`DataStore`]: crate::store::DataStore
//! [`Node`]: crate::store::Node

pub use self::config::{
    HistoryConfig, DEFAULT_HISTORY_DIR, DEFAULT_MAX_HISTORY, DEFAULT_VERSION_DIR,
};
pub use self::facade::HistoryFs;
pub use self::naming::ArchiveName;
pub use self::node::HistoryNode;

mod config;
mod facade;
mod ledger;
pub mod naming;
mod node;
mod retention;
