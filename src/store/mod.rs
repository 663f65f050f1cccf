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

//! Low-level backends for file storage.
//!
//! This module provides the storage backends which the history layer sits on top of. A backend
//! is a [`DataStore`] which resolves paths to [`Node`] handles, and a node provides the basic file
//! and directory operations. Backends don't have to worry about keeping history or tracking
//! versions; those features are implemented at a higher level in [`crate::history`].
//!
//! For each data store, there is a corresponding type which provides the necessary configuration to
//! open that data store. These config types implement [`OpenStore`].
//!
//! [`DataStore`]: crate::store::DataStore
//! [`Node`]: crate::store::Node
//! [`OpenStore`]: crate::store::OpenStore

pub use self::data_store::DataStore;
#[cfg(feature = "store-directory")]
pub use self::directory_store::{DirectoryConfig, DirectoryNode, DirectoryStore};
pub use self::memory_store::{MemoryConfig, MemoryNode, MemoryStore};
pub use self::node::{check_next_version, copy_file, copy_tree, move_tree, Node, NodeExt};
pub use self::open_store::OpenStore;

mod data_store;
mod directory_store;
mod memory_store;
mod node;
mod open_store;
pub(crate) mod path;
