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

use std::io::{Read, Write};
use std::time::{Duration, UNIX_EPOCH};

use historized_fs::store::{DataStore, MemoryStore, Node, NodeExt};

use common::*;

mod common;

fn names(node: &dyn Node) -> anyhow::Result<Vec<String>> {
    Ok(node
        .list()?
        .unwrap_or_default()
        .iter()
        .map(|child| child.name())
        .collect())
}

fn write_and_read(store: &impl DataStore) -> anyhow::Result<()> {
    let file = store.node("/file.txt")?;
    assert_that!(file.exists()?).is_false();

    file.write_string(false, "hello")?;
    file.write_string(true, ", world")?;

    assert_that!(file.is_file()?).is_true();
    assert_that!(file.is_directory()?).is_false();
    assert_that!(file.read_string()?).is_equal_to(String::from("hello, world"));
    assert_that!(file.length()?).is_equal_to(12);

    file.write_string(false, "replaced")?;
    assert_that!(file.read_string()?).is_equal_to(String::from("replaced"));

    Ok(())
}

fn stream_contents(store: &impl DataStore) -> anyhow::Result<()> {
    let file = store.node("/stream.bin")?;

    let mut writer = file.writer(false)?;
    writer.write_all(b"abc")?;
    writer.flush()?;
    drop(writer);

    let mut writer = file.writer(true)?;
    writer.write_all(b"def")?;
    writer.flush()?;
    drop(writer);

    let mut contents = Vec::new();
    file.reader()?.read_to_end(&mut contents)?;
    assert_that!(contents).is_equal_to(b"abcdef".to_vec());

    Ok(())
}

fn directories(store: &impl DataStore) -> anyhow::Result<()> {
    let root = store.node("/")?;
    let nested = store.node("/a/b/c")?;

    assert_that!(nested.mkdir()).is_err_variant(historized_fs::Error::NotFound(String::new()));
    nested.mkdirs()?;
    assert_that!(nested.is_directory()?).is_true();
    assert_that!(nested.mkdir()).is_err_variant(historized_fs::Error::AlreadyExists(String::new()));

    store.node("/a/z.txt")?.write_string(false, "z")?;
    store.node("/a/m.txt")?.write_string(false, "m")?;

    assert_that!(names(root.as_ref())?).is_equal_to(vec![String::from("a")]);
    assert_that!(names(store.node("/a")?.as_ref())?).is_equal_to(vec![
        String::from("b"),
        String::from("m.txt"),
        String::from("z.txt"),
    ]);
    assert_that!(store.node("/a/z.txt")?.list()?.is_none()).is_true();

    let tree = root
        .list_tree()?
        .unwrap_or_default()
        .iter()
        .map(|node| node.absolute_path())
        .collect::<Vec<_>>();
    assert_that!(tree).is_equal_to(vec![
        String::from("/a"),
        String::from("/a/b"),
        String::from("/a/b/c"),
        String::from("/a/m.txt"),
        String::from("/a/z.txt"),
    ]);

    Ok(())
}

fn navigation(store: &impl DataStore) -> anyhow::Result<()> {
    let root = store.node("/")?;
    assert_that!(root.parent().is_none()).is_true();
    assert_that!(root.absolute_path()).is_equal_to(String::from("/"));

    let child = root.child("dir")?.child("file.txt")?;
    assert_that!(child.absolute_path()).is_equal_to(String::from("/dir/file.txt"));
    assert_that!(child.name()).is_equal_to(String::from("file.txt"));
    assert_that!(child.parent().map(|parent| parent.absolute_path()))
        .is_equal_to(Some(String::from("/dir")));

    assert_that!(root.child("a/b").map(|_| ()))
        .is_err_variant(historized_fs::Error::InvalidPath(String::new()));
    assert_that!(root.child("..").map(|_| ()))
        .is_err_variant(historized_fs::Error::InvalidPath(String::new()));
    assert_that!(store.node("/../escape").map(|_| ()))
        .is_err_variant(historized_fs::Error::InvalidPath(String::new()));

    let roots = store.roots()?;
    assert_that!(roots.len()).is_equal_to(1);
    assert_that!(roots[0].absolute_path()).is_equal_to(String::from("/"));

    Ok(())
}

fn deletion(store: &impl DataStore) -> anyhow::Result<()> {
    store.node("/dir/sub")?.mkdirs()?;
    store.node("/dir/sub/file.txt")?.write_string(false, "x")?;
    let dir = store.node("/dir")?;

    assert_that!(dir.delete()).is_err_variant(historized_fs::Error::NotEmpty(String::new()));
    dir.delete_tree()?;
    assert_that!(dir.exists()?).is_false();
    assert_that!(dir.delete()).is_err_variant(historized_fs::Error::NotFound(String::new()));

    let file = store.node("/file.txt")?;
    file.write_string(false, "x")?;
    file.delete()?;
    assert_that!(file.exists()?).is_false();

    store.node("/a.txt")?.write_string(false, "a")?;
    store.node("/b")?.mkdir()?;
    let root = store.node("/")?;
    root.delete_tree()?;
    assert_that!(root.exists()?).is_true();
    assert_that!(names(root.as_ref())?.is_empty()).is_true();

    Ok(())
}

fn renaming(store: &impl DataStore) -> anyhow::Result<()> {
    let mut file = store.node("/old.txt")?;
    file.write_string(false, "contents")?;
    store.node("/taken.txt")?.write_string(false, "taken")?;

    assert_that!(file.rename("taken.txt"))
        .is_err_variant(historized_fs::Error::AlreadyExists(String::new()));

    file.rename("new.txt")?;
    assert_that!(file.absolute_path()).is_equal_to(String::from("/new.txt"));
    assert_that!(file.read_string()?).is_equal_to(String::from("contents"));
    assert_that!(store.node("/old.txt")?.exists()?).is_false();

    Ok(())
}

fn moving(store: &impl DataStore) -> anyhow::Result<()> {
    store.node("/src/inner")?.mkdirs()?;
    store.node("/src/inner/file.txt")?.write_string(false, "x")?;
    store.node("/dest")?.mkdir()?;

    let source = store.node("/src")?;
    let dest = store.node("/dest/moved")?;

    assert_that!(source.move_to(store.node("/src/inner/into")?.as_ref()))
        .is_err_variant(historized_fs::Error::InvalidPath(String::new()));

    source.move_to(dest.as_ref())?;

    assert_that!(source.exists()?).is_false();
    assert_that!(store.node("/dest/moved/inner/file.txt")?.read_string()?)
        .is_equal_to(String::from("x"));

    let other = store.node("/other")?;
    other.mkdir()?;
    assert_that!(other.move_to(dest.as_ref()))
        .is_err_variant(historized_fs::Error::AlreadyExists(String::new()));

    Ok(())
}

fn copying(store: &impl DataStore) -> anyhow::Result<()> {
    store.node("/src/inner")?.mkdirs()?;
    let file = store.node("/src/inner/file.txt")?;
    file.write_string(false, "x")?;
    let modified = UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    file.set_modified(modified)?;

    store.node("/src")?.copy_tree(store.node("/copy")?.as_ref())?;

    let copied = store.node("/copy/inner/file.txt")?;
    assert_that!(copied.read_string()?).is_equal_to(String::from("x"));
    assert_that!(copied.modified()?).is_equal_to(modified);
    assert_that!(file.exists()?).is_true();

    let target = store.node("/single.txt")?;
    file.copy_to(target.as_ref())?;
    assert_that!(target.read_string()?).is_equal_to(String::from("x"));

    Ok(())
}

fn copying_between_stores(store: &impl DataStore) -> anyhow::Result<()> {
    let other = MemoryStore::new();
    other.root().child("dir")?.mkdir()?;
    other
        .root()
        .child("dir")?
        .child("file.txt")?
        .write_string(false, "from memory")?;

    let dest = store.node("/imported")?;
    other.root().child("dir")?.move_to(dest.as_ref())?;

    assert_that!(store.node("/imported/file.txt")?.read_string()?)
        .is_equal_to(String::from("from memory"));
    assert_that!(other.root().child("dir")?.exists()?).is_false();

    Ok(())
}

fn versions_are_unsupported(store: &impl DataStore) -> anyhow::Result<()> {
    let file = store.node("/file.txt")?;
    file.write_string(false, "x")?;

    assert_that!(file.version(false)?).is_equal_to(0);
    assert_that!(file.set_version(0)).is_ok();
    assert_that!(file.set_version(2))
        .is_err_variant(historized_fs::Error::Unsupported(String::new()));
    assert_that!(file.history_times()?.is_empty()).is_true();
    assert_that!(file.history_reader(UNIX_EPOCH).map(|_| ()))
        .is_err_variant(historized_fs::Error::Unsupported(String::new()));
    let dest = store.node("/copy.txt")?;
    assert_that!(file.copy_history_tree(dest.as_ref(), UNIX_EPOCH))
        .is_err_variant(historized_fs::Error::Unsupported(String::new()));
    assert_that!(file.version(true)?).is_equal_to(0);

    Ok(())
}

#[rstest]
fn memory_write_and_read(memory_store: MemoryStore) -> anyhow::Result<()> {
    write_and_read(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_write_and_read(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    write_and_read(&*directory_store)
}

#[rstest]
fn memory_stream_contents(memory_store: MemoryStore) -> anyhow::Result<()> {
    stream_contents(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_stream_contents(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    stream_contents(&*directory_store)
}

#[rstest]
fn memory_directories(memory_store: MemoryStore) -> anyhow::Result<()> {
    directories(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_directories(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    directories(&*directory_store)
}

#[rstest]
fn memory_navigation(memory_store: MemoryStore) -> anyhow::Result<()> {
    navigation(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_navigation(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    navigation(&*directory_store)
}

#[rstest]
fn memory_deletion(memory_store: MemoryStore) -> anyhow::Result<()> {
    deletion(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_deletion(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    deletion(&*directory_store)
}

#[rstest]
fn memory_renaming(memory_store: MemoryStore) -> anyhow::Result<()> {
    renaming(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_renaming(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    renaming(&*directory_store)
}

#[rstest]
fn memory_moving(memory_store: MemoryStore) -> anyhow::Result<()> {
    moving(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_moving(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    moving(&*directory_store)
}

#[rstest]
fn memory_copying(memory_store: MemoryStore) -> anyhow::Result<()> {
    copying(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_copying(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    copying(&*directory_store)
}

#[rstest]
fn memory_copying_between_stores(memory_store: MemoryStore) -> anyhow::Result<()> {
    copying_between_stores(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_copying_between_stores(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    copying_between_stores(&*directory_store)
}

#[rstest]
fn memory_versions_are_unsupported(memory_store: MemoryStore) -> anyhow::Result<()> {
    versions_are_unsupported(&memory_store)
}

#[rstest]
#[cfg(feature = "store-directory")]
fn directory_versions_are_unsupported(
    directory_store: WithTempDir<historized_fs::store::DirectoryStore>,
) -> anyhow::Result<()> {
    versions_are_unsupported(&*directory_store)
}
