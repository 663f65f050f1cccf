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

use std::time::SystemTime;

use super::naming::ArchiveName;
use crate::store::Node;

/// A history entry found in a history directory.
#[derive(Debug)]
pub(crate) struct HistoryEntry {
    pub time: SystemTime,
    pub node: Box<dyn Node>,
}

/// Return the history entries in `history_dir` which match `name`, oldest first.
///
/// A missing history directory has no entries.
pub(crate) fn entries(
    history_dir: &dyn Node,
    name: &ArchiveName,
) -> crate::Result<Vec<HistoryEntry>> {
    let children = match history_dir.list()? {
        Some(children) => children,
        None => return Ok(Vec::new()),
    };

    let mut entries = children
        .into_iter()
        .filter_map(|node| {
            let entry_name = node.name();
            name.parse(&entry_name)
                .map(|time| (entry_name, HistoryEntry { time, node }))
        })
        .collect::<Vec<_>>();

    // Timestamps are fixed-width, so sorting by name sorts by time.
    entries.sort_by(|(left, _), (right, _)| left.cmp(right));

    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

/// Delete the oldest history entries matching `name` until at most `max` remain.
///
/// This returns the number of entries which were deleted.
pub(crate) fn prune(
    history_dir: &dyn Node,
    name: &ArchiveName,
    max: usize,
) -> crate::Result<usize> {
    let entries = entries(history_dir, name)?;
    let excess = entries.len().saturating_sub(max);

    for entry in entries.into_iter().take(excess) {
        tracing::debug!("pruning history entry {}", entry.node.absolute_path());
        if entry.node.is_directory()? {
            entry.node.delete_tree()?;
        } else {
            entry.node.delete()?;
        }
    }

    Ok(excess)
}
