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

//! The naming scheme of history entries.
//!
//! A history entry of the file `report.txt` archived at 2014-02-17 16:55:51.132 UTC is called
//! `report_20140217165551132.txt`. Directories never have an extension, so the entry of the
//! directory `photos.old` is called `photos.old_20140217165551132`.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// The format of the timestamp in the name of a history entry.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// The length of a formatted timestamp.
pub const TIMESTAMP_LEN: usize = 17;

/// The character between the stem of a name and its timestamp.
pub const SEPARATOR: char = '_';

const SECONDS_FORMAT: &str = "%Y%m%d%H%M%S";
const SECONDS_LEN: usize = 14;

/// Format `time` as a fixed-width UTC timestamp with millisecond resolution.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parse a timestamp produced by [`format_timestamp`].
///
/// This returns `None` unless `text` is exactly [`TIMESTAMP_LEN`] digits forming a valid time.
pub fn parse_timestamp(text: &str) -> Option<SystemTime> {
    if text.len() != TIMESTAMP_LEN || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let seconds = NaiveDateTime::parse_from_str(&text[..SECONDS_LEN], SECONDS_FORMAT).ok()?;
    let millis: u64 = text[SECONDS_LEN..].parse().ok()?;
    let time = SystemTime::from(Utc.from_utc_datetime(&seconds));

    Some(time + Duration::from_millis(millis))
}

/// Split a file name into its stem and extension.
///
/// The extension is whatever follows the last dot, unless that dot starts the name.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], Some(&name[index + 1..])),
        _ => (name, None),
    }
}

/// The name pattern of the history entries of one file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    stem: String,
    extension: Option<String>,
}

impl ArchiveName {
    /// The pattern for the history of a file called `name`.
    pub fn for_file(name: &str) -> Self {
        let (stem, extension) = split_name(name);
        ArchiveName {
            stem: stem.to_string(),
            extension: extension.map(str::to_string),
        }
    }

    /// The pattern for the history of a directory called `name`.
    pub fn for_directory(name: &str) -> Self {
        ArchiveName {
            stem: name.to_string(),
            extension: None,
        }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Return the name of the history entry archived at `time`.
    pub fn entry_name(&self, time: SystemTime) -> String {
        let timestamp = format_timestamp(time);
        match &self.extension {
            Some(extension) => format!("{}{}{}.{}", self.stem, SEPARATOR, timestamp, extension),
            None => format!("{}{}{}", self.stem, SEPARATOR, timestamp),
        }
    }

    /// Return the time encoded in `entry_name` if it is a history entry of this pattern.
    pub fn parse(&self, entry_name: &str) -> Option<SystemTime> {
        let expected_len = self.stem.len()
            + SEPARATOR.len_utf8()
            + TIMESTAMP_LEN
            + self.extension.as_ref().map_or(0, |extension| extension.len() + 1);
        if entry_name.len() != expected_len {
            return None;
        }

        let rest = entry_name
            .strip_prefix(self.stem.as_str())?
            .strip_prefix(SEPARATOR)?;
        let timestamp = match &self.extension {
            Some(extension) => rest.strip_suffix(extension.as_str())?.strip_suffix('.')?,
            None => rest,
        };

        parse_timestamp(timestamp)
    }
}
