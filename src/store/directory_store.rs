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

#![cfg(feature = "store-directory")]

use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use filetime::{set_file_mtime, FileTime};
use relative_path::RelativePathBuf;
use uuid::Uuid;
use walkdir::WalkDir;

use super::data_store::DataStore;
use super::node::{copy_tree, move_tree, Node};
use super::open_store::OpenStore;
use super::path;

/// The suffix of the staging files which replace file contents atomically.
const STAGING_SUFFIX: &str = ".stage";

/// The configuration for opening a [`DirectoryStore`].
///
/// [`DirectoryStore`]: crate::store::DirectoryStore
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(docsrs, doc(cfg(feature = "store-directory")))]
pub struct DirectoryConfig {
    /// The path of the directory which is the root of the store.
    pub path: PathBuf,
}

impl OpenStore for DirectoryConfig {
    type Store = DirectoryStore;

    fn open(&self) -> crate::Result<Self::Store> {
        fs::create_dir_all(&self.path)
            .map_err(|error| crate::Error::Store(anyhow::Error::from(error)))?;

        Ok(DirectoryStore {
            root: Arc::new(self.path.clone()),
        })
    }
}

/// A `DataStore` which stores files in a directory in the local file system.
///
/// Replacing the contents of a file is atomic: the new contents are written to a staging file in
/// the same directory which is then renamed over the old file. The local file system cannot set
/// creation times, so [`Node::set_created`] always returns `false`.
///
/// You can use [`DirectoryConfig`] to open a data store of this type.
///
/// [`DirectoryConfig`]: crate::store::DirectoryConfig
/// [`Node::set_created`]: crate::store::Node::set_created
#[derive(Debug, Clone)]
#[cfg_attr(docsrs, doc(cfg(feature = "store-directory")))]
pub struct DirectoryStore {
    /// The path of the store's root directory.
    root: Arc<PathBuf>,
}

impl DirectoryStore {
    /// Return the root directory of this store.
    pub fn root(&self) -> DirectoryNode {
        DirectoryNode {
            root: Arc::clone(&self.root),
            path: RelativePathBuf::new(),
        }
    }
}

impl DataStore for DirectoryStore {
    fn roots(&self) -> crate::Result<Vec<Box<dyn Node>>> {
        Ok(vec![Box::new(self.root())])
    }

    fn node(&self, path: &str) -> crate::Result<Box<dyn Node>> {
        Ok(Box::new(DirectoryNode {
            root: Arc::clone(&self.root),
            path: path::normalize(path)?,
        }))
    }
}

/// A file or directory in a [`DirectoryStore`].
///
/// [`DirectoryStore`]: crate::store::DirectoryStore
#[derive(Debug, Clone)]
#[cfg_attr(docsrs, doc(cfg(feature = "store-directory")))]
pub struct DirectoryNode {
    root: Arc<PathBuf>,
    path: RelativePathBuf,
}

impl DirectoryNode {
    /// Return the path of this node in the local file system.
    pub fn local_path(&self) -> PathBuf {
        self.path.to_path(self.root.as_path())
    }

    fn at(&self, path: RelativePathBuf) -> Self {
        DirectoryNode {
            root: Arc::clone(&self.root),
            path,
        }
    }

    fn not_found(&self) -> crate::Error {
        crate::Error::NotFound(self.absolute_path())
    }

    fn metadata(&self) -> crate::Result<Option<fs::Metadata>> {
        match fs::metadata(self.local_path()) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn existing_metadata(&self) -> crate::Result<fs::Metadata> {
        self.metadata()?.ok_or_else(|| self.not_found())
    }

    /// Check that this node can be written to as a file.
    fn check_writable(&self) -> crate::Result<()> {
        if let Some(metadata) = self.metadata()? {
            if metadata.is_dir() {
                return Err(crate::Error::NotFile(self.absolute_path()));
            }
            return Ok(());
        }
        match self.path.parent() {
            Some(parent) => {
                let parent = self.at(parent.to_relative_path_buf());
                match parent.metadata()? {
                    Some(metadata) if metadata.is_dir() => Ok(()),
                    Some(_) => Err(crate::Error::NotDirectory(parent.absolute_path())),
                    None => Err(crate::Error::NotFound(parent.absolute_path())),
                }
            }
            None => Err(crate::Error::NotFile(self.absolute_path())),
        }
    }

    /// Replace the contents of this file by renaming a staging file over it.
    fn replace_contents(&self, data: &[u8]) -> crate::Result<()> {
        let target = self.local_path();
        let staging_name = format!(".{}{}", Uuid::new_v4().as_hyphenated(), STAGING_SUFFIX);
        let staging_path = target.with_file_name(staging_name);

        let result = File::create(&staging_path)
            .and_then(|mut file| file.write_all(data))
            .and_then(|_| fs::rename(&staging_path, &target));

        if result.is_err() {
            // The staging file may or may not exist at this point.
            let _ = fs::remove_file(&staging_path);
        }

        Ok(result?)
    }

    fn copy_local_tree(&self, dest: &DirectoryNode) -> crate::Result<()> {
        let source_path = self.local_path();
        let dest_path = dest.local_path();

        for entry in WalkDir::new(&source_path).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(&source_path)
                .map_err(|error| crate::Error::Store(anyhow::Error::from(error)))?;
            let target = dest_path.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
                let metadata = entry.metadata().map_err(io::Error::from)?;
                set_file_mtime(&target, FileTime::from_last_modification_time(&metadata))?;
            }
        }

        Ok(())
    }
}

impl Node for DirectoryNode {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn boxed_clone(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }

    fn exists(&self) -> crate::Result<bool> {
        Ok(self.metadata()?.is_some())
    }

    fn is_file(&self) -> crate::Result<bool> {
        Ok(self.metadata()?.map_or(false, |metadata| metadata.is_file()))
    }

    fn is_directory(&self) -> crate::Result<bool> {
        Ok(self.metadata()?.map_or(false, |metadata| metadata.is_dir()))
    }

    fn name(&self) -> String {
        path::file_name(&self.path)
    }

    fn absolute_path(&self) -> String {
        path::absolute(&self.path)
    }

    fn length(&self) -> crate::Result<u64> {
        let metadata = self.existing_metadata()?;
        Ok(if metadata.is_dir() { 0 } else { metadata.len() })
    }

    fn modified(&self) -> crate::Result<SystemTime> {
        Ok(self.existing_metadata()?.modified()?)
    }

    fn created(&self) -> crate::Result<Option<SystemTime>> {
        Ok(self.existing_metadata()?.created().ok())
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
        match self.metadata()? {
            Some(metadata) if metadata.is_dir() => {}
            _ => return Ok(None),
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(self.local_path())? {
            let file_name = entry?.file_name();
            match file_name.to_str() {
                Some(name) => names.push(name.to_string()),
                None => tracing::warn!(
                    "skipping non-UTF-8 file name {:?} in {}",
                    file_name,
                    self.absolute_path()
                ),
            }
        }
        names.sort();

        Ok(Some(
            names
                .into_iter()
                .map(|name| Box::new(self.at(self.path.join(name))) as Box<dyn Node>)
                .collect(),
        ))
    }

    fn mkdir(&self) -> crate::Result<()> {
        if self.exists()? {
            return Err(crate::Error::AlreadyExists(self.absolute_path()));
        }
        if let Some(parent) = self.parent() {
            if !parent.is_directory()? {
                return Err(crate::Error::NotFound(parent.absolute_path()));
            }
        }
        Ok(fs::create_dir(self.local_path())?)
    }

    fn mkdirs(&self) -> crate::Result<()> {
        if self.is_file()? {
            return Err(crate::Error::NotDirectory(self.absolute_path()));
        }
        Ok(fs::create_dir_all(self.local_path())?)
    }

    fn delete(&self) -> crate::Result<()> {
        if self.path.as_str().is_empty() {
            return Err(crate::Error::InvalidPath(self.absolute_path()));
        }
        let metadata = self.existing_metadata()?;
        if metadata.is_dir() {
            if fs::read_dir(self.local_path())?.next().is_some() {
                return Err(crate::Error::NotEmpty(self.absolute_path()));
            }
            fs::remove_dir(self.local_path())?;
        } else {
            fs::remove_file(self.local_path())?;
        }
        Ok(())
    }

    fn delete_tree(&self) -> crate::Result<()> {
        let metadata = self.existing_metadata()?;
        if self.path.as_str().is_empty() {
            // The root directory itself always stays.
            for child in self.list()?.unwrap_or_default() {
                child.delete_tree()?;
            }
        } else if metadata.is_dir() {
            fs::remove_dir_all(self.local_path())?;
        } else {
            fs::remove_file(self.local_path())?;
        }
        Ok(())
    }

    fn rename(&mut self, new_name: &str) -> crate::Result<()> {
        path::validate_name(new_name)?;
        let parent = match self.path.parent() {
            Some(parent) => parent.to_relative_path_buf(),
            None => return Err(crate::Error::InvalidPath(self.absolute_path())),
        };
        let target = self.at(parent.join(new_name));
        if target.path == self.path {
            return Ok(());
        }
        if !self.exists()? {
            return Err(self.not_found());
        }
        if target.exists()? {
            return Err(crate::Error::AlreadyExists(target.absolute_path()));
        }

        fs::rename(self.local_path(), target.local_path())?;
        self.path = target.path;
        Ok(())
    }

    fn move_to(&self, dest: &dyn Node) -> crate::Result<()> {
        let dest = match dest.as_any().downcast_ref::<DirectoryNode>() {
            Some(dest) => dest,
            None => return move_tree(self, dest),
        };

        if !self.exists()? {
            return Err(self.not_found());
        }
        if dest.exists()? {
            return Err(crate::Error::AlreadyExists(dest.absolute_path()));
        }
        if dest.local_path().starts_with(self.local_path()) {
            return Err(crate::Error::InvalidPath(dest.absolute_path()));
        }
        dest.check_writable()?;

        Ok(fs::rename(self.local_path(), dest.local_path())?)
    }

    fn copy_tree(&self, dest: &dyn Node) -> crate::Result<()> {
        match dest.as_any().downcast_ref::<DirectoryNode>() {
            Some(local_dest) if self.is_directory()? => self.copy_local_tree(local_dest),
            _ => copy_tree(self, dest),
        }
    }

    fn set_modified(&self, time: SystemTime) -> crate::Result<()> {
        self.existing_metadata()?;
        Ok(set_file_mtime(
            self.local_path(),
            FileTime::from_system_time(time),
        )?)
    }

    fn set_created(&self, _time: SystemTime) -> crate::Result<bool> {
        self.existing_metadata()?;
        Ok(false)
    }

    fn read_bytes(&self) -> crate::Result<Vec<u8>> {
        if self.existing_metadata()?.is_dir() {
            return Err(crate::Error::NotFile(self.absolute_path()));
        }
        Ok(fs::read(self.local_path())?)
    }

    fn write_bytes(&self, append: bool, data: &[u8]) -> crate::Result<()> {
        self.check_writable()?;
        if append {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.local_path())?;
            file.write_all(data)?;
            Ok(())
        } else {
            self.replace_contents(data)
        }
    }

    fn reader(&self) -> crate::Result<Box<dyn Read + Send>> {
        if self.existing_metadata()?.is_dir() {
            return Err(crate::Error::NotFile(self.absolute_path()));
        }
        Ok(Box::new(File::open(self.local_path())?))
    }

    fn writer(&self, append: bool) -> crate::Result<Box<dyn Write + Send>> {
        self.check_writable()?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(self.local_path())?;
        Ok(Box::new(file))
    }
}
