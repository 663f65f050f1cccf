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
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use super::config::Settings;
use super::ledger::{remove_if_empty, VersionLedger};
use super::naming::{format_timestamp, ArchiveName};
use super::retention;
use crate::store::{copy_file, move_tree, Node};

/// A [`Node`] which keeps the history and version of the file or directory it wraps.
///
/// Every change to a file through this node first archives the old contents into the history
/// directory beside it, and every change bumps the version of the file. The history and version
/// directories are hidden from [`Node::list`] and can't be reached with [`Node::child`].
///
/// Instances are created by [`HistoryFs::create_by_path`], or by navigating from another
/// `HistoryNode`.
///
/// [`HistoryFs::create_by_path`]: crate::history::HistoryFs::create_by_path
#[derive(Debug)]
pub struct HistoryNode {
    inner: Box<dyn Node>,
    settings: Arc<Settings>,
    cached_version: Mutex<Option<u64>>,
}

/// What a content mutation needs to know about the file before it happened.
#[derive(Debug, Clone, Copy)]
struct Mutation {
    existed: bool,
    created: Option<SystemTime>,
    version: u64,
}

impl HistoryNode {
    pub(crate) fn new(inner: Box<dyn Node>, settings: Arc<Settings>) -> Self {
        HistoryNode {
            inner,
            settings,
            cached_version: Mutex::new(None),
        }
    }

    /// Return `node` as a `HistoryNode` if it is one.
    pub fn downcast(node: &dyn Node) -> Option<&HistoryNode> {
        node.as_any().downcast_ref::<HistoryNode>()
    }

    /// The node of the underlying store which this node wraps.
    pub fn inner(&self) -> &dyn Node {
        self.inner.as_ref()
    }

    /// Delete every history entry of this file or directory.
    ///
    /// The history directory is deleted as well if nothing else is left in it. This returns the
    /// number of entries which were deleted.
    pub fn purge_history(&self) -> crate::Result<usize> {
        let history_dir = match self.history_dir()? {
            Some(history_dir) => history_dir,
            None => return Ok(0),
        };

        let mut removed = 0;
        for name in self.archive_names()? {
            removed += retention::prune(history_dir.as_ref(), &name, 0)?;
        }
        remove_if_empty(Some(history_dir))?;

        tracing::debug!(
            "purged {} history entries of {}",
            removed,
            self.absolute_path()
        );
        Ok(removed)
    }

    /// Delete every history directory in the tree rooted at this directory.
    ///
    /// This returns the number of history entries which were deleted.
    pub fn purge_history_tree(&self) -> crate::Result<usize> {
        let history_dir = match self.settings.history_dir() {
            Some(history_dir) => history_dir,
            None => return Ok(0),
        };
        let removed = purge_tree(
            self.inner.as_ref(),
            history_dir,
            self.settings.version_dir(),
        )?;

        tracing::debug!(
            "purged {} history entries under {}",
            removed,
            self.absolute_path()
        );
        Ok(removed)
    }

    fn wrap(&self, inner: Box<dyn Node>) -> HistoryNode {
        HistoryNode::new(inner, Arc::clone(&self.settings))
    }

    fn ledger(&self) -> VersionLedger<'_> {
        VersionLedger::new(self.settings.version_dir())
    }

    fn cache(&self, version: Option<u64>) {
        *self
            .cached_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = version;
    }

    fn cached(&self) -> Option<u64> {
        *self
            .cached_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_name(&self, name: &str) -> crate::Result<()> {
        if self.settings.is_reserved(name) {
            return Err(crate::Error::IllegalPathItemName {
                path: self.absolute_path(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn visible_children(&self) -> crate::Result<Option<Vec<HistoryNode>>> {
        Ok(self.inner.list()?.map(|children| {
            children
                .into_iter()
                .filter(|child| !self.settings.is_reserved(&child.name()))
                .map(|child| self.wrap(child))
                .collect()
        }))
    }

    /// The history directory beside this node, or `None` if history is off or this is a root.
    fn history_dir(&self) -> crate::Result<Option<Box<dyn Node>>> {
        let name = match self.settings.history_dir() {
            Some(name) => name,
            None => return Ok(None),
        };
        match self.inner.parent() {
            Some(parent) => Ok(Some(parent.child(name)?)),
            None => Ok(None),
        }
    }

    /// The name patterns which history entries of this node may have.
    ///
    /// A node which doesn't exist may have history as a file or as a directory.
    fn archive_names(&self) -> crate::Result<Vec<ArchiveName>> {
        let name = self.inner.name();
        if self.inner.is_directory()? {
            Ok(vec![ArchiveName::for_directory(&name)])
        } else if self.inner.is_file()? {
            Ok(vec![ArchiveName::for_file(&name)])
        } else {
            let file = ArchiveName::for_file(&name);
            let directory = ArchiveName::for_directory(&name);
            if file == directory {
                Ok(vec![file])
            } else {
                Ok(vec![file, directory])
            }
        }
    }

    /// Put the current state of this node into its history directory and prune old entries.
    ///
    /// If `keep_live` is `true`, the node is copied and stays where it is. Otherwise it is moved.
    fn archive(&self, keep_live: bool) -> crate::Result<()> {
        let history_dir = match self.history_dir()? {
            Some(history_dir) => history_dir,
            None => return Ok(()),
        };

        let inner_name = self.inner.name();
        let name = if self.inner.is_directory()? {
            ArchiveName::for_directory(&inner_name)
        } else {
            ArchiveName::for_file(&inner_name)
        };

        history_dir.mkdirs()?;

        // Two archives within one millisecond would collide.
        let mut time = self.settings.clock().now();
        let mut entry = history_dir.child(&name.entry_name(time))?;
        while entry.exists()? {
            time += Duration::from_millis(1);
            entry = history_dir.child(&name.entry_name(time))?;
        }

        tracing::debug!(
            "archiving {} (modified {}) as {}",
            self.absolute_path(),
            describe_modified(self.inner.as_ref()),
            entry.absolute_path()
        );

        if keep_live {
            self.inner.copy_tree(entry.as_ref())?;
        } else {
            self.inner.move_to(entry.as_ref())?;
        }

        if let Some(max) = self.settings.max_history() {
            retention::prune(history_dir.as_ref(), &name, max)?;
        }

        Ok(())
    }

    /// Archive the file and bump its version ahead of a content mutation.
    fn prepare(&self, append: bool) -> crate::Result<Mutation> {
        let existed = self.inner.exists()?;
        if existed && self.inner.is_directory()? {
            return Err(crate::Error::NotFile(self.absolute_path()));
        }

        let ledger = self.ledger();
        let created = if existed { self.inner.created()? } else { None };
        let current = if existed {
            ledger.state(self.inner.as_ref())?.number()
        } else {
            ledger.remove(self.inner.as_ref())?;
            0
        };

        if existed {
            self.archive(append)?;
        }

        let version = if ledger.is_tracking() { current + 1 } else { 0 };
        if existed {
            ledger.store(self.inner.as_ref(), version)?;
        }

        Ok(Mutation {
            existed,
            created,
            version,
        })
    }

    fn finish(&self, mutation: Mutation) -> crate::Result<()> {
        if let Some(created) = mutation.created {
            self.inner.set_created(created)?;
        }
        if self.ledger().is_tracking() {
            self.cache(Some(mutation.version));
        }
        Ok(())
    }

    /// Look up the history entry of this node at `time`.
    fn history_entry(&self, time: SystemTime) -> crate::Result<Box<dyn Node>> {
        let history_dir = match self.history_dir()? {
            Some(history_dir) => history_dir,
            None => {
                return Err(crate::Error::Unsupported(format!(
                    "history is disabled for '{}'",
                    self.absolute_path()
                )))
            }
        };

        for name in self.archive_names()? {
            let entry = history_dir.child(&name.entry_name(time))?;
            if entry.exists()? {
                return Ok(entry);
            }
        }

        Err(crate::Error::HistoryNotFound {
            path: self.absolute_path(),
            time: format_timestamp(time),
        })
    }

    /// Copy the visible tree rooted at this node to `dest`.
    ///
    /// Versions are carried over to `dest` only if `with_versions` is `true`.
    fn copy_visible(&self, dest: &dyn Node, with_versions: bool) -> crate::Result<()> {
        if let Some(children) = self.visible_children()? {
            dest.mkdirs()?;
            for child in children {
                let target = dest.child(&child.name())?;
                child.copy_visible(target.as_ref(), with_versions)?;
            }
            Ok(())
        } else if self.inner.is_file()? {
            copy_file(self, dest)?;
            if with_versions {
                self.copy_version(dest)?;
            }
            Ok(())
        } else {
            Err(crate::Error::NotFound(self.absolute_path()))
        }
    }

    fn copy_version(&self, dest: &dyn Node) -> crate::Result<()> {
        if !self.ledger().is_tracking() {
            return Ok(());
        }
        match HistoryNode::downcast(dest) {
            Some(dest) if dest.ledger().is_tracking() => dest.set_version(self.version(false)?),
            _ => Ok(()),
        }
    }
}

impl Node for HistoryNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn boxed_clone(&self) -> Box<dyn Node> {
        Box::new(HistoryNode {
            inner: self.inner.boxed_clone(),
            settings: Arc::clone(&self.settings),
            cached_version: Mutex::new(self.cached()),
        })
    }

    fn exists(&self) -> crate::Result<bool> {
        self.inner.exists()
    }

    fn is_file(&self) -> crate::Result<bool> {
        self.inner.is_file()
    }

    fn is_directory(&self) -> crate::Result<bool> {
        self.inner.is_directory()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    fn absolute_path(&self) -> String {
        self.inner.absolute_path()
    }

    fn length(&self) -> crate::Result<u64> {
        self.inner.length()
    }

    fn modified(&self) -> crate::Result<SystemTime> {
        self.inner.modified()
    }

    fn created(&self) -> crate::Result<Option<SystemTime>> {
        self.inner.created()
    }

    fn parent(&self) -> Option<Box<dyn Node>> {
        self.inner
            .parent()
            .map(|parent| Box::new(self.wrap(parent)) as Box<dyn Node>)
    }

    fn child(&self, name: &str) -> crate::Result<Box<dyn Node>> {
        self.check_name(name)?;
        Ok(Box::new(self.wrap(self.inner.child(name)?)))
    }

    fn list(&self) -> crate::Result<Option<Vec<Box<dyn Node>>>> {
        Ok(self.visible_children()?.map(|children| {
            children
                .into_iter()
                .map(|child| Box::new(child) as Box<dyn Node>)
                .collect()
        }))
    }

    fn mkdir(&self) -> crate::Result<()> {
        self.inner.mkdir()
    }

    fn mkdirs(&self) -> crate::Result<()> {
        self.inner.mkdirs()
    }

    fn delete(&self) -> crate::Result<()> {
        if !self.inner.exists()? {
            return Err(crate::Error::NotFound(self.absolute_path()));
        }
        if self.inner.parent().is_none() {
            return Err(crate::Error::InvalidPath(self.absolute_path()));
        }
        if matches!(self.visible_children()?, Some(children) if !children.is_empty()) {
            return Err(crate::Error::NotEmpty(self.absolute_path()));
        }

        self.archive(false)?;

        // History is off, or only reserved directories were left inside.
        if self.inner.exists()? {
            self.inner.delete_tree()?;
        }

        let ledger = self.ledger();
        ledger.remove(self.inner.as_ref())?;
        if ledger.is_tracking() {
            self.cache(Some(0));
        }
        Ok(())
    }

    fn delete_tree(&self) -> crate::Result<()> {
        if !self.inner.exists()? {
            return Err(crate::Error::NotFound(self.absolute_path()));
        }
        if self.inner.is_file()? {
            return self.delete();
        }

        // A root can't be archived, so its children are deleted one by one.
        if self.inner.parent().is_none() {
            for child in self.visible_children()?.unwrap_or_default() {
                child.delete_tree()?;
            }
            return Ok(());
        }

        self.archive(false)?;
        if self.inner.exists()? {
            self.inner.delete_tree()?;
        }
        Ok(())
    }

    fn rename(&mut self, new_name: &str) -> crate::Result<()> {
        self.check_name(new_name)?;

        let ledger = VersionLedger::new(self.settings.version_dir());
        let record = ledger.existing_record(self.inner.as_ref())?;
        self.inner.rename(new_name)?;
        if let Some(record) = record {
            ledger.follow_rename(record, new_name)?;
        }
        Ok(())
    }

    fn move_to(&self, dest: &dyn Node) -> crate::Result<()> {
        self.check_name(&dest.name())?;

        let history_dest = match HistoryNode::downcast(dest) {
            Some(history_dest) => history_dest,
            None => return move_tree(self, dest),
        };

        self.inner.move_to(history_dest.inner.as_ref())?;

        let ledger = self.ledger();
        ledger.relocate(
            self.inner.as_ref(),
            history_dest.inner.as_ref(),
            &history_dest.ledger(),
        )?;

        history_dest.cache(None);
        if ledger.is_tracking() {
            self.cache(Some(0));
        }
        Ok(())
    }

    fn copy_tree(&self, dest: &dyn Node) -> crate::Result<()> {
        self.copy_visible(dest, true)
    }

    fn set_modified(&self, time: SystemTime) -> crate::Result<()> {
        self.inner.set_modified(time)
    }

    fn set_created(&self, time: SystemTime) -> crate::Result<bool> {
        self.inner.set_created(time)
    }

    fn read_bytes(&self) -> crate::Result<Vec<u8>> {
        self.inner.read_bytes()
    }

    fn write_bytes(&self, append: bool, data: &[u8]) -> crate::Result<()> {
        let mutation = self.prepare(append)?;
        self.inner.write_bytes(append, data)?;
        self.finish(mutation)
    }

    fn reader(&self) -> crate::Result<Box<dyn Read + Send>> {
        self.inner.reader()
    }

    fn writer(&self, append: bool) -> crate::Result<Box<dyn Write + Send>> {
        let mutation = self.prepare(append)?;

        // Without history the old contents are still there and must go before streaming.
        if !append && mutation.existed && self.inner.exists()? {
            self.inner.write_bytes(false, &[])?;
        }

        let writer = self.inner.writer(true)?;
        self.finish(mutation)?;
        Ok(writer)
    }

    fn version(&self, allow_cache: bool) -> crate::Result<u64> {
        let ledger = self.ledger();
        if !ledger.is_tracking() {
            return Ok(0);
        }
        if allow_cache {
            if let Some(version) = self.cached() {
                return Ok(version);
            }
        }

        let version = ledger.state(self.inner.as_ref())?.number();
        self.cache(Some(version));
        Ok(version)
    }

    fn set_version(&self, version: u64) -> crate::Result<()> {
        let ledger = self.ledger();
        if !ledger.is_tracking() {
            if version == 0 {
                return Ok(());
            }
            return Err(crate::Error::Unsupported(format!(
                "versioning is disabled for '{}'",
                self.absolute_path()
            )));
        }
        if version == 0 {
            return Ok(());
        }

        ledger.store(self.inner.as_ref(), version)?;
        self.cache(Some(version));
        Ok(())
    }

    fn history_times(&self) -> crate::Result<BTreeSet<SystemTime>> {
        let history_dir = match self.history_dir()? {
            Some(history_dir) => history_dir,
            None => return Ok(BTreeSet::new()),
        };

        let mut times = BTreeSet::new();
        for name in self.archive_names()? {
            for entry in retention::entries(history_dir.as_ref(), &name)? {
                times.insert(entry.time);
            }
        }
        Ok(times)
    }

    fn history_reader(&self, time: SystemTime) -> crate::Result<Box<dyn Read + Send>> {
        let entry = self.history_entry(time)?;
        if !entry.is_file()? {
            return Err(crate::Error::NotFile(entry.absolute_path()));
        }
        entry.reader()
    }

    fn copy_history_tree(&self, dest: &dyn Node, time: SystemTime) -> crate::Result<()> {
        let entry = self.history_entry(time)?;
        self.wrap(entry).copy_visible(dest, false)
    }
}

/// Return the modification time of `node` for diagnostics, or `unknown` if it can't be read.
fn describe_modified(node: &dyn Node) -> String {
    match node.modified() {
        Ok(time) => format_timestamp(time),
        Err(error) => {
            tracing::warn!(
                "could not read the modification time of {}: {}",
                node.absolute_path(),
                error
            );
            String::from("unknown")
        }
    }
}

/// Delete every directory called `history_dir` under `node`, skipping version directories.
fn purge_tree(
    node: &dyn Node,
    history_dir: &str,
    version_dir: Option<&str>,
) -> crate::Result<usize> {
    let mut removed = 0;
    for child in node.list()?.unwrap_or_default() {
        let name = child.name();
        if name == history_dir {
            removed += child.list()?.map_or(0, |entries| entries.len());
            child.delete_tree()?;
        } else if Some(name.as_str()) != version_dir && child.is_directory()? {
            removed += purge_tree(child.as_ref(), history_dir, version_dir)?;
        }
    }
    Ok(removed)
}
