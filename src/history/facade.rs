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

use std::sync::Arc;

use super::config::{HistoryConfig, Settings};
use super::node::HistoryNode;
use crate::clock::{Clock, SystemClock};
use crate::store::path;
use crate::store::{DataStore, OpenStore};

/// A file system which keeps the history and versions of everything stored in a [`DataStore`].
///
/// Nodes are obtained with [`create_by_path`] and [`list_roots`], and every node reachable from
/// them is a [`HistoryNode`] which shares this file system's configuration.
///
/// [`create_by_path`]: crate::history::HistoryFs::create_by_path
/// [`list_roots`]: crate::history::HistoryFs::list_roots
#[derive(Debug)]
pub struct HistoryFs<S: DataStore> {
    store: S,
    config: HistoryConfig,
    settings: Arc<Settings>,
}

impl<S: DataStore> HistoryFs<S> {
    /// Create a file system over `store` which uses the system clock.
    ///
    /// # Errors
    /// - `Error::Config`: The `config` is invalid.
    pub fn new(store: S, config: HistoryConfig) -> crate::Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a file system over `store` which names history entries using `clock`.
    ///
    /// # Errors
    /// - `Error::Config`: The `config` is invalid.
    pub fn with_clock(
        store: S,
        config: HistoryConfig,
        clock: Arc<dyn Clock>,
    ) -> crate::Result<Self> {
        let settings = Settings::new(&config, clock)?;
        tracing::debug!(
            "opened history file system with history in {:?} and versions in {:?}",
            settings.history_dir(),
            settings.version_dir()
        );
        Ok(HistoryFs {
            store,
            config,
            settings: Arc::new(settings),
        })
    }

    /// Open the data store described by `store_config` and create a file system over it.
    ///
    /// # Errors
    /// - `Error::Config`: The `config` is invalid.
    /// - `Error::Store`: The data store could not be opened.
    pub fn open<O>(store_config: &O, config: HistoryConfig) -> crate::Result<Self>
    where
        O: OpenStore<Store = S>,
    {
        Self::new(store_config.open()?, config)
    }

    /// The configuration this file system was created with.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The data store which holds the files.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume this file system and return its data store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Return the node at the slash-separated `path`.
    ///
    /// The node doesn't have to exist.
    ///
    /// # Errors
    /// - `Error::Config`: The path passes through a reserved directory.
    /// - `Error::InvalidPath`: The path escapes the root of the store.
    pub fn create_by_path(&self, path: &str) -> crate::Result<HistoryNode> {
        let normalized = path::normalize(path)?;

        if let Some(segment) = normalized
            .as_str()
            .split('/')
            .find(|segment| self.settings.is_reserved(segment))
        {
            return Err(crate::Error::Config(format!(
                "the path '{}' passes through the reserved directory '{}'",
                path, segment
            )));
        }

        let inner = self.store.node(normalized.as_str())?;
        Ok(HistoryNode::new(inner, Arc::clone(&self.settings)))
    }

    /// Return the root directories of the store.
    pub fn list_roots(&self) -> crate::Result<Vec<HistoryNode>> {
        Ok(self
            .store
            .roots()?
            .into_iter()
            .map(|root| HistoryNode::new(root, Arc::clone(&self.settings)))
            .collect())
    }
}
