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

use std::io;
use std::result;

use thiserror::Error as DeriveError;

/// The error type for operations on a node or file system.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// A file or directory name collides with a reserved directory name.
    #[error("'{name}' is a reserved name and cannot be used under '{path}'.")]
    IllegalPathItemName { path: String, name: String },

    /// A guarded write supplied a version which is not the successor of the current version.
    #[error("Wrong version for '{path}': expected {expected}, but {supplied} was supplied.")]
    WrongVersion {
        path: String,
        expected: u64,
        supplied: u64,
    },

    /// The operation is not supported by this node or configuration.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The configuration is invalid or was used in a way it does not permit.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A resource already exists.
    #[error("A resource already exists: '{0}'.")]
    AlreadyExists(String),

    /// A resource was not found.
    #[error("A resource was not found: '{0}'.")]
    NotFound(String),

    /// The directory is not empty.
    #[error("The directory is not empty: '{0}'.")]
    NotEmpty(String),

    /// The file is not a directory.
    #[error("The file is not a directory: '{0}'.")]
    NotDirectory(String),

    /// The file is not a regular file.
    #[error("The file is not a regular file: '{0}'.")]
    NotFile(String),

    /// The provided file path is invalid.
    #[error("The provided file path is invalid: '{0}'.")]
    InvalidPath(String),

    /// There is no history entry for a file at the given time.
    #[error("There is no history entry for '{path}' at {time}.")]
    HistoryNotFound { path: String, time: String },

    /// A version record does not contain a valid version number.
    #[error("The version record of '{0}' is corrupt.")]
    CorruptVersion(String),

    /// A value could not be serialized.
    #[error("A value could not be serialized.")]
    Serialize,

    /// A value could not be deserialized.
    #[error("A value could not be deserialized.")]
    Deserialize,

    /// An error occurred with the data store.
    #[error("An error occurred with the data store.")]
    Store(#[from] anyhow::Error),

    /// An I/O error occurred.
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// The result type for operations on a node or file system.
pub type Result<T> = result::Result<T, Error>;
