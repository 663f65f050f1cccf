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
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use relative_path::RelativePathBuf;

use super::data_store::DataStore;
use super::node::{move_tree, Node};
use super::open_store::OpenStore;
use super::path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File {
        data: Vec<u8>,
        modified: SystemTime,
        created: SystemTime,
    },
    Directory {
        modified: SystemTime,
        created: SystemTime,
    },
}

impl Entry {
    fn directory() -> Self {
        let now = SystemTime::now();
        Entry::Directory {
            modified: now,
            created: now,
        }
    }

    fn file(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Entry::File {
            data,
            modified: now,
            created: now,
        }
    }
}

/// Entries keyed by their normalized path. The root is the empty string.
type Tree = BTreeMap<String, Entry>;

#[derive(Debug)]
struct SharedTree(Mutex<Tree>);

impl SharedTree {
    fn new() -> Self {
        let mut tree = Tree::new();
        tree.insert(String::new(), Entry::directory());
        SharedTree(Mutex::new(tree))
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parent_key(key: &str) -> Option<&str> {
    match key.rfind('/') {
        Some(index) => Some(&key[..index]),
        None if key.is_empty() => None,
        None => Some(""),
    }
}

fn child_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{}/", key)
    }
}

/// Return the keys of the children of `key` in order.
fn children_keys(tree: &Tree, key: &str) -> Vec<String> {
    let prefix = child_prefix(key);
    tree.range(prefix.clone()..)
        .take_while(|(candidate, _)| candidate.starts_with(&prefix))
        .filter(|(candidate, _)| {
            !candidate.is_empty() && !candidate[prefix.len()..].contains('/')
        })
        .map(|(candidate, _)| candidate.clone())
        .collect()
}

/// Return the keys of `key` and all of its descendants.
fn subtree_keys(tree: &Tree, key: &str) -> Vec<String> {
    let prefix = child_prefix(key);
    let mut keys: Vec<String> = tree
        .range(prefix.clone()..)
        .take_while(|(candidate, _)| candidate.starts_with(&prefix))
        .filter(|(candidate, _)| candidate.as_str() != key)
        .map(|(candidate, _)| candidate.clone())
        .collect();
    if tree.contains_key(key) {
        keys.push(key.to_string());
    }
    keys
}

/// Move `from` and all of its descendants to `to`.
fn rekey(tree: &mut Tree, from: &str, to: &str) {
    for key in subtree_keys(tree, from) {
        if let Some(entry) = tree.remove(&key) {
            tree.insert(format!("{}{}", to, &key[from.len()..]), entry);
        }
    }
}

/// The configuration for opening a [`MemoryStore`].
///
/// Every store opened from the same `MemoryConfig` shares the same tree, so data written through
/// one store can be read through another.
///
/// [`MemoryStore`]: crate::store::MemoryStore
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    tree: Arc<SharedTree>,
}

impl MemoryConfig {
    /// Create a new config for an empty memory store.
    pub fn new() -> Self {
        MemoryConfig {
            tree: Arc::new(SharedTree::new()),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenStore for MemoryConfig {
    type Store = MemoryStore;

    fn open(&self) -> crate::Result<Self::Store> {
        Ok(MemoryStore {
            tree: Arc::clone(&self.tree),
        })
    }
}

/// A `DataStore` which stores files in memory.
///
/// Unlike other `DataStore` implementations, data in a `MemoryStore` is not stored persistently
/// and is only accessible to the current process. This data store is useful for testing.
///
/// A `MemoryStore` has a single root and records both the modification and creation time of each
/// node.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tree: Arc<SharedTree>,
}

impl MemoryStore {
    /// Create a new empty `MemoryStore`.
    pub fn new() -> Self {
        MemoryStore {
            tree: Arc::new(SharedTree::new()),
        }
    }

    /// Return the root directory of this store.
    pub fn root(&self) -> MemoryNode {
        MemoryNode {
            tree: Arc::clone(&self.tree),
            path: RelativePathBuf::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for MemoryStore {
    fn roots(&self) -> crate::Result<Vec<Box<dyn Node>>> {
        Ok(vec![Box::new(self.root())])
    }

    fn node(&self, path: &str) -> crate::Result<Box<dyn Node>> {
        Ok(Box::new(MemoryNode {
            tree: Arc::clone(&self.tree),
            path: path::normalize(path)?,
        }))
    }
}

/// A file or directory in a [`MemoryStore`].
///
/// [`MemoryStore`]: crate::store::MemoryStore
#[derive(Debug, Clone)]
pub struct MemoryNode {
    tree: Arc<SharedTree>,
    path: RelativePathBuf,
}

impl MemoryNode {
    fn key(&self) -> &str {
        self.path.as_str()
    }

    fn at(&self, path: RelativePathBuf) -> Self {
        MemoryNode {
            tree: Arc::clone(&self.tree),
            path,
        }
    }

    fn not_found(&self) -> crate::Error {
        crate::Error::NotFound(self.absolute_path())
    }

    fn entry(&self) -> crate::Result<Entry> {
        self.tree
            .lock()
            .get(self.key())
            .cloned()
            .ok_or_else(|| self.not_found())
    }

    /// Check that the parent of `key` is an existing directory.
    fn check_parent(tree: &Tree, key: &str) -> crate::Result<()> {
        let parent = parent_key(key).unwrap_or_default();
        match tree.get(parent) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(crate::Error::NotDirectory(format!("/{}", parent))),
            None => Err(crate::Error::NotFound(format!("/{}", parent))),
        }
    }
}

impl Node for MemoryNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn boxed_clone(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }

    fn exists(&self) -> crate::Result<bool> {
        Ok(self.tree.lock().contains_key(self.key()))
    }

    fn is_file(&self) -> crate::Result<bool> {
        Ok(matches!(
            self.tree.lock().get(self.key()),
            Some(Entry::File { .. })
        ))
    }

    fn is_directory(&self) -> crate::Result<bool> {
        Ok(matches!(
            self.tree.lock().get(self.key()),
            Some(Entry::Directory { .. })
        ))
    }

    fn name(&self) -> String {
        path::file_name(&self.path)
    }

    fn absolute_path(&self) -> String {
        path::absolute(&self.path)
    }

    fn length(&self) -> crate::Result<u64> {
        match self.entry()? {
            Entry::File { data, .. } => Ok(data.len() as u64),
            Entry::Directory { .. } => Ok(0),
        }
    }

    fn modified(&self) -> crate::Result<SystemTime> {
        match self.entry()? {
            Entry::File { modified, .. } | Entry::Directory { modified, .. } => Ok(modified),
        }
    }

    fn created(&self) -> crate::Result<Option<SystemTime>> {
        match self.entry()? {
            Entry::File { created, .. } | Entry::Directory { created, .. } => Ok(Some(created)),
        }
    }

    fn parent(&self) -> Option<Box<dyn Node>> {
        let parent = self.path.parent()?.to_relative_path_buf();
        Some(Box::new(self.at(parent)))
    }

    fn child(&self, name: &str) -> crate::Result<Box<dyn Node>> {
        path::validate_name(name)?;
        Ok(Box::new(self.at(self.path.join(name))))
    }

    fn list(&self) -> crate::Result<Option<Vec<Box<dyn Node>>>> {
        let tree = self.tree.lock();
        match tree.get(self.key()) {
            Some(Entry::Directory { .. }) => Ok(Some(
                children_keys(&tree, self.key())
                    .into_iter()
                    .map(|key| Box::new(self.at(RelativePathBuf::from(key))) as Box<dyn Node>)
                    .collect(),
            )),
            _ => Ok(None),
        }
    }

    fn mkdir(&self) -> crate::Result<()> {
        let mut tree = self.tree.lock();
        if tree.contains_key(self.key()) {
            return Err(crate::Error::AlreadyExists(self.absolute_path()));
        }
        Self::check_parent(&tree, self.key())?;
        tree.insert(self.key().to_string(), Entry::directory());
        Ok(())
    }

    fn mkdirs(&self) -> crate::Result<()> {
        let mut tree = self.tree.lock();
        let mut current = String::new();
        for name in self.key().split('/').filter(|name| !name.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(name);
            match tree.get(&current) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(crate::Error::NotDirectory(format!("/{}", current)))
                }
                None => {
                    tree.insert(current.clone(), Entry::directory());
                }
            }
        }
        Ok(())
    }

    fn delete(&self) -> crate::Result<()> {
        if self.key().is_empty() {
            return Err(crate::Error::InvalidPath(self.absolute_path()));
        }
        let mut tree = self.tree.lock();
        match tree.get(self.key()) {
            None => return Err(self.not_found()),
            Some(Entry::Directory { .. }) if !children_keys(&tree, self.key()).is_empty() => {
                return Err(crate::Error::NotEmpty(self.absolute_path()))
            }
            Some(_) => {}
        }
        tree.remove(self.key());
        Ok(())
    }

    fn delete_tree(&self) -> crate::Result<()> {
        let mut tree = self.tree.lock();
        if !tree.contains_key(self.key()) {
            return Err(self.not_found());
        }
        for key in subtree_keys(&tree, self.key()) {
            // The root itself always stays.
            if !key.is_empty() {
                tree.remove(&key);
            }
        }
        Ok(())
    }

    fn rename(&mut self, new_name: &str) -> crate::Result<()> {
        path::validate_name(new_name)?;
        let parent = match self.path.parent() {
            Some(parent) => parent.to_relative_path_buf(),
            None => return Err(crate::Error::InvalidPath(self.absolute_path())),
        };
        let target = parent.join(new_name);
        if target == self.path {
            return Ok(());
        }

        let mut tree = self.tree.lock();
        if !tree.contains_key(self.key()) {
            return Err(self.not_found());
        }
        if tree.contains_key(target.as_str()) {
            return Err(crate::Error::AlreadyExists(path::absolute(&target)));
        }
        rekey(&mut tree, self.path.as_str(), target.as_str());
        drop(tree);

        self.path = target;
        Ok(())
    }

    fn move_to(&self, dest: &dyn Node) -> crate::Result<()> {
        let dest = match dest.as_any().downcast_ref::<MemoryNode>() {
            Some(dest) if Arc::ptr_eq(&self.tree, &dest.tree) => dest,
            _ => return move_tree(self, dest),
        };

        let mut tree = self.tree.lock();
        if !tree.contains_key(self.key()) {
            return Err(self.not_found());
        }
        if tree.contains_key(dest.key()) {
            return Err(crate::Error::AlreadyExists(dest.absolute_path()));
        }
        if path::is_within(dest.key(), self.key()) {
            return Err(crate::Error::InvalidPath(dest.absolute_path()));
        }
        Self::check_parent(&tree, dest.key())?;
        rekey(&mut tree, self.key(), dest.key());
        Ok(())
    }

    fn set_modified(&self, time: SystemTime) -> crate::Result<()> {
        let mut tree = self.tree.lock();
        match tree.get_mut(self.key()) {
            Some(Entry::File { modified, .. }) | Some(Entry::Directory { modified, .. }) => {
                *modified = time;
                Ok(())
            }
            None => Err(self.not_found()),
        }
    }

    fn set_created(&self, time: SystemTime) -> crate::Result<bool> {
        let mut tree = self.tree.lock();
        match tree.get_mut(self.key()) {
            Some(Entry::File { created, .. }) | Some(Entry::Directory { created, .. }) => {
                *created = time;
                Ok(true)
            }
            None => Err(self.not_found()),
        }
    }

    fn read_bytes(&self) -> crate::Result<Vec<u8>> {
        match self.entry()? {
            Entry::File { data, .. } => Ok(data),
            Entry::Directory { .. } => Err(crate::Error::NotFile(self.absolute_path())),
        }
    }

    fn write_bytes(&self, append: bool, data: &[u8]) -> crate::Result<()> {
        let mut tree = self.tree.lock();
        match tree.get_mut(self.key()) {
            Some(Entry::File {
                data: contents,
                modified,
                ..
            }) => {
                if !append {
                    contents.clear();
                }
                contents.extend_from_slice(data);
                *modified = SystemTime::now();
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(crate::Error::NotFile(self.absolute_path())),
            None => {
                Self::check_parent(&tree, self.key())?;
                tree.insert(self.key().to_string(), Entry::file(data.to_vec()));
                Ok(())
            }
        }
    }

    fn reader(&self) -> crate::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.read_bytes()?)))
    }

    fn writer(&self, append: bool) -> crate::Result<Box<dyn Write + Send>> {
        self.write_bytes(append, &[])?;
        Ok(Box::new(MemoryWriter {
            tree: Arc::clone(&self.tree),
            key: self.key().to_string(),
        }))
    }
}

/// A writer which appends directly to a file in a `MemoryStore`.
struct MemoryWriter {
    tree: Arc<SharedTree>,
    key: String,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self.tree.lock();
        match tree.get_mut(&self.key) {
            Some(Entry::File { data, modified, .. }) => {
                data.extend_from_slice(buf);
                *modified = SystemTime::now();
                Ok(buf.len())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("the file '/{}' no longer exists", self.key),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
