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

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::store::path::validate_name;

/// The default name of the directories which hold history entries.
pub const DEFAULT_HISTORY_DIR: &str = "~history";

/// The default name of the directories which hold version records.
pub const DEFAULT_VERSION_DIR: &str = "~version";

/// The default maximum number of history entries kept per file.
pub const DEFAULT_MAX_HISTORY: i32 = 10;

/// The configuration for a [`HistoryFs`].
///
/// This type implements `Default` to provide a reasonable default configuration. It can be
/// serialized so that it can be stored alongside other application settings.
///
/// [`HistoryFs`]: crate::history::HistoryFs
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// The name of the directory beside each file which holds its history entries.
    ///
    /// The default value is `~history`.
    pub history_dir: String,

    /// The name of the directory beside each file which holds its version record.
    ///
    /// The default value is `~version`.
    pub version_dir: String,

    /// The maximum number of history entries kept for each file or directory.
    ///
    /// A negative value keeps every entry and `0` turns history off entirely. The default value
    /// is `10`.
    pub max_history: i32,

    /// Whether every file has a version number which is incremented on each change.
    ///
    /// The default value is `true`.
    pub versioning: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            history_dir: String::from(DEFAULT_HISTORY_DIR),
            version_dir: String::from(DEFAULT_VERSION_DIR),
            max_history: DEFAULT_MAX_HISTORY,
            versioning: true,
        }
    }
}

/// The validated settings shared by every node of one `HistoryFs`.
///
/// A reserved directory name is `None` when its feature is turned off, so nothing with that name
/// is ever created or hidden.
#[derive(Debug)]
pub(crate) struct Settings {
    history_dir: Option<String>,
    version_dir: Option<String>,
    max_history: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl Settings {
    /// Validate `config` and resolve it into settings.
    ///
    /// # Errors
    /// - `Error::Config`: A reserved directory name is not a valid file name or both names are
    /// equal.
    pub fn new(config: &HistoryConfig, clock: Arc<dyn Clock>) -> crate::Result<Self> {
        check_dir_name("history_dir", &config.history_dir)?;
        check_dir_name("version_dir", &config.version_dir)?;
        if config.history_dir == config.version_dir {
            return Err(crate::Error::Config(format!(
                "the history and version directories are both called '{}'",
                config.history_dir
            )));
        }

        Ok(Settings {
            history_dir: if config.max_history == 0 {
                None
            } else {
                Some(config.history_dir.clone())
            },
            version_dir: if config.versioning {
                Some(config.version_dir.clone())
            } else {
                None
            },
            max_history: usize::try_from(config.max_history).ok(),
            clock,
        })
    }

    /// The name of the history directory, or `None` if history is off.
    pub fn history_dir(&self) -> Option<&str> {
        self.history_dir.as_deref()
    }

    /// The name of the version directory, or `None` if versioning is off.
    pub fn version_dir(&self) -> Option<&str> {
        self.version_dir.as_deref()
    }

    /// The maximum number of history entries, or `None` if there is no limit.
    pub fn max_history(&self) -> Option<usize> {
        self.max_history
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Return whether `name` is one of the reserved directory names in use.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.history_dir() == Some(name) || self.version_dir() == Some(name)
    }
}

fn check_dir_name(field: &str, name: &str) -> crate::Result<()> {
    validate_name(name).map_err(|_| {
        crate::Error::Config(format!("'{}' is not a valid value for {}", name, field))
    })
}
