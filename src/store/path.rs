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

use relative_path::{Component, RelativePath, RelativePathBuf};

/// Normalize a slash-separated `path` so that it is relative to the root of a store.
///
/// Leading slashes are ignored and `.` and `..` components are resolved.
///
/// # Errors
/// - `Error::InvalidPath`: The path escapes the root of the store.
pub fn normalize(path: &str) -> crate::Result<RelativePathBuf> {
    let normalized = RelativePath::new(path.trim_start_matches('/')).normalize();

    if normalized
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(crate::Error::InvalidPath(path.to_string()));
    }

    Ok(normalized)
}

/// Check that `name` can be used as the name of a single file or directory.
///
/// # Errors
/// - `Error::InvalidPath`: The name is empty, `.`, `..` or contains a separator.
pub fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(&['/', '\\', '\0'][..]) {
        return Err(crate::Error::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// Return the absolute, slash-prefixed form of a normalized `path`.
pub fn absolute(path: &RelativePath) -> String {
    format!("/{}", path)
}

/// Return the last component of `path`, or the empty string for the root.
pub fn file_name(path: &RelativePath) -> String {
    path.file_name().unwrap_or_default().to_string()
}

/// Return whether `path` is `ancestor` or lies somewhere beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path[ancestor.len()..].starts_with('/'))
}
