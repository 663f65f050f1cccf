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

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Read, Write};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use static_assertions::assert_obj_safe;

/// A file or directory in a [`DataStore`].
///
/// A `Node` is a handle to a path. The path doesn't need to exist; most queries on a node which
/// doesn't exist return `false` or `None`, and writing to it creates it. Handles are cheap and
/// don't own the data they point to, so any number of handles can address the same path.
///
/// Every method takes `&self` except [`Node::rename`], which changes the path the handle points
/// to. Implementations use interior mutability for any state they need to share.
///
/// The version and history methods have default implementations which describe a node that does
/// not track versions or keep history: its version is always `0` and it has no history entries.
///
/// [`DataStore`]: crate::store::DataStore
pub trait Node: fmt::Debug + Send + Sync {
    /// Return this node as `Any` so that callers can recognize their own node types.
    fn as_any(&self) -> &dyn Any;

    /// Return a new handle to the same path.
    fn boxed_clone(&self) -> Box<dyn Node>;

    /// Return whether a file or directory exists at this path.
    fn exists(&self) -> crate::Result<bool>;

    /// Return whether this node is an existing regular file.
    fn is_file(&self) -> crate::Result<bool>;

    /// Return whether this node is an existing directory.
    fn is_directory(&self) -> crate::Result<bool>;

    /// Return the file name of this node, which is empty for a root.
    fn name(&self) -> String;

    /// Return the absolute path of this node within its store.
    fn absolute_path(&self) -> String;

    /// Return the size of this file in bytes, or `0` for a directory.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    fn length(&self) -> crate::Result<u64>;

    /// Return the time this node was last modified.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    fn modified(&self) -> crate::Result<SystemTime>;

    /// Return the time this node was created, or `None` if the store doesn't record it.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    fn created(&self) -> crate::Result<Option<SystemTime>>;

    /// Return the parent directory of this node, or `None` if this is a root.
    fn parent(&self) -> Option<Box<dyn Node>>;

    /// Return a handle to the child of this node called `name`.
    ///
    /// The child doesn't need to exist.
    ///
    /// # Errors
    /// - `Error::InvalidPath`: The `name` is not a valid file name.
    fn child(&self, name: &str) -> crate::Result<Box<dyn Node>>;

    /// Return the children of this directory sorted by name.
    ///
    /// This returns `None` if this node does not exist or is not a directory.
    fn list(&self) -> crate::Result<Option<Vec<Box<dyn Node>>>>;

    /// Return every descendant of this directory, parents before their children.
    ///
    /// This returns `None` if this node does not exist or is not a directory.
    fn list_tree(&self) -> crate::Result<Option<Vec<Box<dyn Node>>>> {
        let children = match self.list()? {
            Some(children) => children,
            None => return Ok(None),
        };
        let mut tree = Vec::new();
        collect_tree(children, &mut tree)?;
        Ok(Some(tree))
    }

    /// Return the names of the children of this directory, one per line.
    ///
    /// Directory names end with a `/`. This returns `None` if this node does not exist or is not a
    /// directory.
    fn list_dir_as_string(&self) -> crate::Result<Option<String>> {
        let children = match self.list()? {
            Some(children) => children,
            None => return Ok(None),
        };
        let mut lines = Vec::with_capacity(children.len());
        for child in children {
            if child.is_directory()? {
                lines.push(format!("{}/", child.name()));
            } else {
                lines.push(child.name());
            }
        }
        Ok(Some(lines.join("\n")))
    }

    /// Create this directory.
    ///
    /// # Errors
    /// - `Error::AlreadyExists`: A file or directory already exists at this path.
    /// - `Error::NotFound`: The parent directory does not exist.
    fn mkdir(&self) -> crate::Result<()>;

    /// Create this directory and any missing parent directories.
    ///
    /// This does nothing if the directory already exists.
    ///
    /// # Errors
    /// - `Error::NotDirectory`: This node or one of its ancestors is a file.
    fn mkdirs(&self) -> crate::Result<()>;

    /// Delete this file or empty directory.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    /// - `Error::NotEmpty`: The node is a directory which is not empty.
    /// - `Error::InvalidPath`: The node is a root.
    fn delete(&self) -> crate::Result<()>;

    /// Delete this file or directory and all of its descendants.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    fn delete_tree(&self) -> crate::Result<()>;

    /// Rename this node within its parent directory and point this handle at the new path.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    /// - `Error::AlreadyExists`: A sibling called `new_name` already exists.
    /// - `Error::InvalidPath`: The `new_name` is not a valid file name.
    fn rename(&mut self, new_name: &str) -> crate::Result<()>;

    /// Move this node and all of its descendants to `dest`.
    ///
    /// This handle keeps pointing at the old path, which no longer exists afterwards. Stores move
    /// nodes within themselves natively and fall back to [`move_tree`] for any other destination.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node or the parent of `dest` does not exist.
    /// - `Error::AlreadyExists`: The `dest` already exists.
    /// - `Error::InvalidPath`: The `dest` is inside this node.
    fn move_to(&self, dest: &dyn Node) -> crate::Result<()>;

    /// Copy the contents of this file to `dest`, replacing the contents of `dest`.
    ///
    /// # Errors
    /// - `Error::NotFile`: This node is not a regular file.
    fn copy_to(&self, dest: &dyn Node) -> crate::Result<()> {
        copy_file(self, dest)
    }

    /// Copy this file or directory and all of its descendants to `dest`.
    ///
    /// # Errors
    /// - `Error::NotFound`: This node does not exist.
    fn copy_tree(&self, dest: &dyn Node) -> crate::Result<()> {
        copy_tree(self, dest)
    }

    /// Set the time this node was last modified.
    fn set_modified(&self, time: SystemTime) -> crate::Result<()>;

    /// Set the time this node was created.
    ///
    /// This returns `false` if the store doesn't support setting the creation time.
    fn set_created(&self, time: SystemTime) -> crate::Result<bool>;

    /// Return the contents of this file.
    ///
    /// # Errors
    /// - `Error::NotFound`: The node does not exist.
    /// - `Error::NotFile`: The node is not a regular file.
    fn read_bytes(&self) -> crate::Result<Vec<u8>>;

    /// Write `data` to this file, creating it if it doesn't exist.
    ///
    /// If `append` is `false`, the previous contents are replaced.
    ///
    /// # Errors
    /// - `Error::NotFound`: The parent directory does not exist.
    /// - `Error::NotFile`: The node is a directory.
    fn write_bytes(&self, append: bool, data: &[u8]) -> crate::Result<()>;

    /// Return a reader over the contents of this file.
    fn reader(&self) -> crate::Result<Box<dyn Read + Send>>;

    /// Return a writer to this file, creating it if it doesn't exist.
    ///
    /// If `append` is `false`, the file is truncated before this method returns.
    fn writer(&self, append: bool) -> crate::Result<Box<dyn Write + Send>>;

    /// Return the version of this file.
    ///
    /// The version is `0` if the file doesn't exist or this node doesn't track versions. If
    /// `allow_cache` is `true`, the node may return the last version it observed instead of
    /// reading it again.
    fn version(&self, _allow_cache: bool) -> crate::Result<u64> {
        Ok(0)
    }

    /// Set the version of this file.
    ///
    /// Setting the version to `0` does nothing.
    ///
    /// # Errors
    /// - `Error::Unsupported`: This node doesn't track versions.
    fn set_version(&self, version: u64) -> crate::Result<()> {
        if version == 0 {
            return Ok(());
        }
        Err(crate::Error::Unsupported(format!(
            "'{}' does not track versions",
            self.absolute_path()
        )))
    }

    /// Return the current version and the contents of this file.
    fn read_bytes_and_version(&self) -> crate::Result<(u64, Vec<u8>)> {
        let version = self.version(false)?;
        Ok((version, self.read_bytes()?))
    }

    /// Replace the contents of this file with `data` if `new_version` follows the current version.
    ///
    /// # Errors
    /// - `Error::WrongVersion`: The `new_version` is not one more than the current version.
    fn write_bytes_for_version(&self, data: &[u8], new_version: u64) -> crate::Result<()> {
        check_next_version(self, new_version)?;
        self.write_bytes(false, data)
    }

    /// Return a writer to this file if `new_version` follows the current version.
    ///
    /// # Errors
    /// - `Error::WrongVersion`: The `new_version` is not one more than the current version.
    fn writer_for_version(
        &self,
        append: bool,
        new_version: u64,
    ) -> crate::Result<Box<dyn Write + Send>> {
        check_next_version(self, new_version)?;
        self.writer(append)
    }

    /// Return the times of the history entries of this node in ascending order.
    fn history_times(&self) -> crate::Result<BTreeSet<SystemTime>> {
        Ok(BTreeSet::new())
    }

    /// Return a reader over the history entry of this file at `time`.
    ///
    /// # Errors
    /// - `Error::Unsupported`: This node doesn't keep history.
    /// - `Error::HistoryNotFound`: There is no history entry at `time`.
    fn history_reader(&self, _time: SystemTime) -> crate::Result<Box<dyn Read + Send>> {
        Err(crate::Error::Unsupported(format!(
            "'{}' does not keep history",
            self.absolute_path()
        )))
    }

    /// Copy the history entry of this node at `time` to `dest`.
    ///
    /// # Errors
    /// - `Error::Unsupported`: This node doesn't keep history.
    /// - `Error::HistoryNotFound`: There is no history entry at `time`.
    fn copy_history_tree(&self, _dest: &dyn Node, _time: SystemTime) -> crate::Result<()> {
        Err(crate::Error::Unsupported(format!(
            "'{}' does not keep history",
            self.absolute_path()
        )))
    }
}

assert_obj_safe!(Node);

/// Convenience methods for reading and writing strings and serializable values.
///
/// These are implemented for every [`Node`] in terms of its byte methods. Values are serialized
/// with MessagePack.
pub trait NodeExt: Node {
    /// Return the contents of this file as a UTF-8 string.
    fn read_string(&self) -> crate::Result<String> {
        into_string(self.read_bytes()?)
    }

    /// Write `text` to this file.
    fn write_string(&self, append: bool, text: &str) -> crate::Result<()> {
        self.write_bytes(append, text.as_bytes())
    }

    /// Deserialize the contents of this file.
    fn read_object<T: DeserializeOwned>(&self) -> crate::Result<T> {
        rmp_serde::from_slice(&self.read_bytes()?).map_err(|_| crate::Error::Deserialize)
    }

    /// Replace the contents of this file with the serialized `value`.
    fn write_object<T: Serialize + ?Sized>(&self, value: &T) -> crate::Result<()> {
        let data = rmp_serde::to_vec(value).map_err(|_| crate::Error::Serialize)?;
        self.write_bytes(false, &data)
    }

    /// Return the current version and the contents of this file as a UTF-8 string.
    fn read_string_and_version(&self) -> crate::Result<(u64, String)> {
        let (version, data) = self.read_bytes_and_version()?;
        Ok((version, into_string(data)?))
    }

    /// Replace the contents of this file with `text` if `new_version` follows the current version.
    fn write_string_for_version(&self, text: &str, new_version: u64) -> crate::Result<()> {
        self.write_bytes_for_version(text.as_bytes(), new_version)
    }

    /// Return the current version and the deserialized contents of this file.
    fn read_object_and_version<T: DeserializeOwned>(&self) -> crate::Result<(u64, T)> {
        let (version, data) = self.read_bytes_and_version()?;
        let value = rmp_serde::from_slice(&data).map_err(|_| crate::Error::Deserialize)?;
        Ok((version, value))
    }

    /// Replace the contents of this file with the serialized `value` if `new_version` follows the
    /// current version.
    fn write_object_for_version<T: Serialize + ?Sized>(
        &self,
        value: &T,
        new_version: u64,
    ) -> crate::Result<()> {
        let data = rmp_serde::to_vec(value).map_err(|_| crate::Error::Serialize)?;
        self.write_bytes_for_version(&data, new_version)
    }
}

impl<N: Node + ?Sized> NodeExt for N {}

fn into_string(data: Vec<u8>) -> crate::Result<String> {
    String::from_utf8(data)
        .map_err(|error| crate::Error::Io(io::Error::new(io::ErrorKind::InvalidData, error)))
}

fn collect_tree(children: Vec<Box<dyn Node>>, tree: &mut Vec<Box<dyn Node>>) -> crate::Result<()> {
    for child in children {
        let grandchildren = child.list()?;
        tree.push(child);
        if let Some(grandchildren) = grandchildren {
            collect_tree(grandchildren, tree)?;
        }
    }
    Ok(())
}

/// Check that `new_version` is the successor of the current version of `node`.
///
/// The current version is always read fresh.
///
/// # Errors
/// - `Error::WrongVersion`: The `new_version` is not one more than the current version.
pub fn check_next_version<N: Node + ?Sized>(node: &N, new_version: u64) -> crate::Result<()> {
    let expected = node.version(false)? + 1;
    if new_version != expected {
        return Err(crate::Error::WrongVersion {
            path: node.absolute_path(),
            expected,
            supplied: new_version,
        });
    }
    Ok(())
}

/// Copy the contents and modification time of the file `source` to `dest` through their streams.
///
/// # Errors
/// - `Error::NotFile`: The `source` is not a regular file.
pub fn copy_file<N: Node + ?Sized>(source: &N, dest: &dyn Node) -> crate::Result<()> {
    if !source.is_file()? {
        return Err(crate::Error::NotFile(source.absolute_path()));
    }

    let mut reader = source.reader()?;
    let mut writer = dest.writer(false)?;
    io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    drop(writer);

    dest.set_modified(source.modified()?)
}

/// Copy `source` and all of its descendants to `dest` using only the methods of [`Node`].
///
/// # Errors
/// - `Error::NotFound`: The `source` does not exist.
pub fn copy_tree<N: Node + ?Sized>(source: &N, dest: &dyn Node) -> crate::Result<()> {
    if source.is_directory()? {
        dest.mkdirs()?;
        for child in source.list()?.unwrap_or_default() {
            let target = dest.child(&child.name())?;
            copy_tree(child.as_ref(), target.as_ref())?;
        }
        Ok(())
    } else if source.is_file()? {
        copy_file(source, dest)
    } else {
        Err(crate::Error::NotFound(source.absolute_path()))
    }
}

/// Move `source` to `dest` by copying the tree and then deleting the source tree.
///
/// This is the fallback for moves between different kinds of nodes. It is not atomic.
///
/// # Errors
/// - `Error::AlreadyExists`: The `dest` already exists.
/// - `Error::NotFound`: The `source` does not exist.
pub fn move_tree<N: Node + ?Sized>(source: &N, dest: &dyn Node) -> crate::Result<()> {
    if dest.exists()? {
        return Err(crate::Error::AlreadyExists(dest.absolute_path()));
    }
    copy_tree(source, dest)?;
    source.delete_tree()
}
