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

#[cfg(feature = "store-directory")]
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rstest::*;
#[cfg(feature = "store-directory")]
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use historized_fs::clock::{Clock, ManualClock};
use historized_fs::history::{HistoryConfig, HistoryFs, HistoryNode};
#[cfg(feature = "store-directory")]
use historized_fs::store::{DirectoryConfig, DirectoryStore};
use historized_fs::store::{DataStore, MemoryConfig, MemoryStore, Node, NodeExt, OpenStore};

/// The time the test clock starts at, which is 2014-02-17 16:55:51.132 UTC.
pub const START_MILLIS: u64 = 1_392_656_151_132;

/// Set up logging so that `RUST_LOG` controls the output of a test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Return the time `millis` milliseconds after the start of the test clock.
pub fn start_plus(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(START_MILLIS + millis)
}

/// A history file system over a store, with a clock that only moves when told to.
pub struct TestFs<S: DataStore> {
    pub fs: HistoryFs<S>,
    pub clock: Arc<ManualClock>,
}

impl<S: DataStore> TestFs<S> {
    pub fn new(store: S, config: HistoryConfig) -> anyhow::Result<Self> {
        init_logging();
        let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
        let fs = HistoryFs::with_clock(store, config, Arc::clone(&clock) as Arc<dyn Clock>)?;
        Ok(TestFs { fs, clock })
    }

    /// Return the history node at `path`.
    pub fn node(&self, path: &str) -> HistoryNode {
        self.fs.create_by_path(path).unwrap()
    }

    /// Return the node at `path` in the underlying store, which sees the reserved directories.
    pub fn raw(&self, path: &str) -> Box<dyn Node> {
        self.fs.store().node(path).unwrap()
    }

    /// Return the names of the children of the directory at `path` in the underlying store.
    pub fn raw_names(&self, path: &str) -> Vec<String> {
        self.raw(path)
            .list()
            .unwrap()
            .unwrap_or_default()
            .iter()
            .map(|child| child.name())
            .collect()
    }

    /// Write `text` to the file at `path`, creating its parent directories.
    pub fn write(&self, path: &str, text: &str) -> anyhow::Result<HistoryNode> {
        let node = self.fs.create_by_path(path)?;
        if let Some(parent) = node.parent() {
            parent.mkdirs()?;
        }
        node.write_string(false, text)?;
        Ok(node)
    }

    /// Move the clock forward by one second.
    pub fn tick(&self) {
        self.clock.advance(Duration::from_secs(1));
    }

    pub fn now(&self) -> SystemTime {
        self.clock.now()
    }
}

/// A value which is tied to the lifetime of a temporary directory.
#[cfg(feature = "store-directory")]
pub struct WithTempDir<T> {
    directory: TempDir,
    value: T,
}

#[cfg(feature = "store-directory")]
impl<T> Deref for WithTempDir<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(feature = "store-directory")]
impl<T> DerefMut for WithTempDir<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

#[fixture]
pub fn memory_store() -> MemoryStore {
    init_logging();
    MemoryConfig::new().open().unwrap()
}

#[cfg(feature = "store-directory")]
#[fixture]
pub fn directory_store() -> WithTempDir<DirectoryStore> {
    init_logging();
    let directory = tempfile::tempdir().unwrap();
    let config = DirectoryConfig {
        path: directory.as_ref().join("store"),
    };
    let store = config.open().unwrap();
    WithTempDir {
        directory,
        value: store,
    }
}

/// A history file system over memory with the default configuration.
#[fixture]
pub fn test_fs() -> TestFs<MemoryStore> {
    TestFs::new(MemoryStore::new(), HistoryConfig::default()).unwrap()
}

/// A history file system over memory with history turned off.
#[fixture]
pub fn no_history_fs() -> TestFs<MemoryStore> {
    let config = HistoryConfig {
        max_history: 0,
        ..HistoryConfig::default()
    };
    TestFs::new(MemoryStore::new(), config).unwrap()
}

/// A history file system over memory with versioning turned off.
#[fixture]
pub fn unversioned_fs() -> TestFs<MemoryStore> {
    let config = HistoryConfig {
        versioning: false,
        ..HistoryConfig::default()
    };
    TestFs::new(MemoryStore::new(), config).unwrap()
}

/// A history file system over a temporary directory with the default configuration.
#[cfg(feature = "store-directory")]
#[fixture]
pub fn directory_fs(
    directory_store: WithTempDir<DirectoryStore>,
) -> WithTempDir<TestFs<DirectoryStore>> {
    let WithTempDir { directory, value } = directory_store;
    WithTempDir {
        directory,
        value: TestFs::new(value, HistoryConfig::default()).unwrap(),
    }
}
