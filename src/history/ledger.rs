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

use crate::store::Node;

/// What the version ledger knows about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionState {
    /// Versioning is off.
    Untracked,

    /// The file doesn't exist and has no record.
    Absent,

    /// The file exists without a record, which means it is at its first version.
    ImplicitOne,

    /// The record holds a version greater than one.
    Recorded(u64),
}

impl VersionState {
    /// The version number this state stands for.
    pub fn number(self) -> u64 {
        match self {
            VersionState::Untracked | VersionState::Absent => 0,
            VersionState::ImplicitOne => 1,
            VersionState::Recorded(version) => version,
        }
    }
}

/// Reads and writes the version records kept in the version directory beside each file.
///
/// The record of `dir/name` is the file `dir/<version dir>/name` holding the version as a decimal
/// string. Only versions greater than one are recorded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VersionLedger<'a> {
    dir_name: Option<&'a str>,
}

impl<'a> VersionLedger<'a> {
    pub fn new(dir_name: Option<&'a str>) -> Self {
        VersionLedger { dir_name }
    }

    pub fn is_tracking(&self) -> bool {
        self.dir_name.is_some()
    }

    /// Return the node where the record of `node` lives, whether or not it exists.
    ///
    /// This returns `None` if versioning is off or `node` has no parent.
    pub fn record(&self, node: &dyn Node) -> crate::Result<Option<Box<dyn Node>>> {
        let dir_name = match self.dir_name {
            Some(dir_name) => dir_name,
            None => return Ok(None),
        };
        let parent = match node.parent() {
            Some(parent) => parent,
            None => return Ok(None),
        };
        Ok(Some(parent.child(dir_name)?.child(&node.name())?))
    }

    /// Return the record of `node` if one exists.
    pub fn existing_record(&self, node: &dyn Node) -> crate::Result<Option<Box<dyn Node>>> {
        match self.record(node)? {
            Some(record) if record.is_file()? => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    /// Read the version state of `node`.
    ///
    /// # Errors
    /// - `Error::CorruptVersion`: The record does not hold a valid version.
    pub fn state(&self, node: &dyn Node) -> crate::Result<VersionState> {
        if !self.is_tracking() {
            return Ok(VersionState::Untracked);
        }

        if let Some(record) = self.existing_record(node)? {
            let text = String::from_utf8(record.read_bytes()?)
                .map_err(|_| crate::Error::CorruptVersion(record.absolute_path()))?;
            return match text.parse::<u64>() {
                Ok(0) | Err(_) => Err(crate::Error::CorruptVersion(record.absolute_path())),
                Ok(1) => Ok(VersionState::ImplicitOne),
                Ok(version) => Ok(VersionState::Recorded(version)),
            };
        }

        if node.exists()? {
            Ok(VersionState::ImplicitOne)
        } else {
            Ok(VersionState::Absent)
        }
    }

    /// Record `version` for `node`.
    ///
    /// Storing `0` does nothing and storing `1` removes the record.
    pub fn store(&self, node: &dyn Node, version: u64) -> crate::Result<()> {
        match version {
            0 => Ok(()),
            1 => self.remove(node).map(|_| ()),
            _ => {
                let record = match self.record(node)? {
                    Some(record) => record,
                    None => return Ok(()),
                };
                if let Some(dir) = record.parent() {
                    dir.mkdirs()?;
                }
                tracing::debug!("recording version {} of {}", version, node.absolute_path());
                record.write_bytes(false, version.to_string().as_bytes())
            }
        }
    }

    /// Delete the record of `node` and its version directory if that is left empty.
    ///
    /// This returns whether a record was deleted.
    pub fn remove(&self, node: &dyn Node) -> crate::Result<bool> {
        match self.existing_record(node)? {
            Some(record) => {
                record.delete()?;
                remove_if_empty(record.parent())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rename `record` to `new_name`, replacing any stale record with that name.
    pub fn follow_rename(&self, mut record: Box<dyn Node>, new_name: &str) -> crate::Result<()> {
        if let Some(dir) = record.parent() {
            let stale = dir.child(new_name)?;
            if stale.exists()? {
                stale.delete()?;
            }
        }
        record.rename(new_name)
    }

    /// Move the record of `source` so that it becomes the record of `dest` in `dest_ledger`.
    ///
    /// The record is dropped if `dest_ledger` doesn't track versions.
    pub fn relocate(
        &self,
        source: &dyn Node,
        dest: &dyn Node,
        dest_ledger: &VersionLedger,
    ) -> crate::Result<()> {
        let record = match self.existing_record(source)? {
            Some(record) => record,
            None => return Ok(()),
        };

        match dest_ledger.record(dest)? {
            Some(target) => {
                if target.exists()? {
                    target.delete()?;
                }
                if let Some(dir) = target.parent() {
                    dir.mkdirs()?;
                }
                record.move_to(target.as_ref())?;
            }
            None => record.delete()?,
        }

        remove_if_empty(record.parent())
    }
}

/// Delete `dir` if it is an empty directory.
pub(crate) fn remove_if_empty(dir: Option<Box<dyn Node>>) -> crate::Result<()> {
    if let Some(dir) = dir {
        if matches!(dir.list()?, Some(children) if children.is_empty()) {
            dir.delete()?;
        }
    }
    Ok(())
}
