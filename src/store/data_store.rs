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

use std::fmt;
use std::sync::Arc;

use static_assertions::assert_obj_safe;

use super::node::Node;

/// A tree of files and directories addressed by path.
///
/// A `DataStore` is the storage backend underneath the history layer. It only has to resolve
/// paths to [`Node`] handles; everything else happens through the nodes themselves.
///
/// [`Node`]: crate::store::Node
pub trait DataStore: fmt::Debug + Send + Sync {
    /// Return a node for each root of this store.
    fn roots(&self) -> crate::Result<Vec<Box<dyn Node>>>;

    /// Return a node for the given slash-separated `path`.
    ///
    /// The path is interpreted relative to the first root. The node doesn't need to exist.
    ///
    /// # Errors
    /// - `Error::InvalidPath`: The path escapes the root of the store.
    fn node(&self, path: &str) -> crate::Result<Box<dyn Node>>;
}

assert_obj_safe!(DataStore);

impl DataStore for Box<dyn DataStore> {
    fn roots(&self) -> crate::Result<Vec<Box<dyn Node>>> {
        self.as_ref().roots()
    }

    fn node(&self, path: &str) -> crate::Result<Box<dyn Node>> {
        self.as_ref().node(path)
    }
}

impl<S: DataStore + ?Sized> DataStore for Arc<S> {
    fn roots(&self) -> crate::Result<Vec<Box<dyn Node>>> {
        self.as_ref().roots()
    }

    fn node(&self, path: &str) -> crate::Result<Box<dyn Node>> {
        self.as_ref().node(path)
    }
}
