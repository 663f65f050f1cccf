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

use std::io::Write;

use serde::{Deserialize, Serialize};

use historized_fs::store::{MemoryStore, Node, NodeExt};

use common::*;

mod common;

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Settings {
    name: String,
    retries: u32,
}

#[rstest]
fn missing_file_has_version_zero(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let missing = test_fs.node("/missing.txt");

    assert_that!(missing.version(false)?).is_equal_to(0);
    assert_that!(missing.version(true)?).is_equal_to(0);

    Ok(())
}

#[rstest]
fn every_write_bumps_version(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "0")?;
    for expected in 2..=5 {
        file.write_string(true, "+")?;
        assert_that!(file.version(false)?).is_equal_to(expected);
    }
    assert_that!(test_fs.raw("/~version/file.txt").read_string()?)
        .is_equal_to(String::from("5"));

    Ok(())
}

#[rstest]
fn guarded_write_succeeds_with_next_version(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.node("/file.txt");

    file.write_string_for_version("first", 1)?;
    file.write_string_for_version("second", 2)?;

    let (version, text) = file.read_string_and_version()?;
    assert_that!(version).is_equal_to(2);
    assert_that!(text).is_equal_to(String::from("second"));

    Ok(())
}

#[rstest]
fn guarded_write_rejects_stale_version(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "mine")?;

    // Another handle changes the file behind our back.
    test_fs.node("/file.txt").write_string(false, "theirs")?;
    let history = file.history_times()?;

    let result = file.write_string_for_version("mine again", 2);
    assert_that!(result).is_err_variant(historized_fs::Error::WrongVersion {
        path: String::new(),
        expected: 0,
        supplied: 0,
    });
    match result {
        Err(historized_fs::Error::WrongVersion {
            expected, supplied, ..
        }) => {
            assert_that!(expected).is_equal_to(3);
            assert_that!(supplied).is_equal_to(2);
        }
        _ => unreachable!(),
    }
    assert_that!(file.read_string()?).is_equal_to(String::from("theirs"));
    assert_that!(file.version(false)?).is_equal_to(2);
    assert_that!(file.history_times()?).is_equal_to(history);

    Ok(())
}

#[rstest]
fn guarded_writer_checks_version(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "a")?;

    assert_that!(file.writer_for_version(false, 1).map(|_| ()))
        .is_err_variant(historized_fs::Error::WrongVersion {
            path: String::new(),
            expected: 0,
            supplied: 0,
        });

    let mut writer = file.writer_for_version(true, 2)?;
    writer.write_all(b"b")?;
    drop(writer);

    assert_that!(file.read_string()?).is_equal_to(String::from("ab"));
    assert_that!(file.version(false)?).is_equal_to(2);

    Ok(())
}

#[rstest]
fn cached_version_can_be_stale(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "a")?;
    assert_that!(file.version(true)?).is_equal_to(1);

    test_fs.node("/file.txt").write_string(false, "b")?;

    assert_that!(file.version(true)?).is_equal_to(1);
    assert_that!(file.version(false)?).is_equal_to(2);
    assert_that!(file.version(true)?).is_equal_to(2);

    Ok(())
}

#[rstest]
fn set_version_overrides_record(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "a")?;

    file.set_version(42)?;
    assert_that!(file.version(false)?).is_equal_to(42);
    assert_that!(test_fs.raw("/~version/file.txt").read_string()?)
        .is_equal_to(String::from("42"));

    file.set_version(1)?;
    assert_that!(file.version(false)?).is_equal_to(1);
    assert_that!(test_fs.raw("/~version").exists()?).is_false();

    file.set_version(0)?;
    assert_that!(file.version(false)?).is_equal_to(1);

    Ok(())
}

#[rstest]
fn corrupt_record_is_reported(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/file.txt", "a")?;
    let dir = test_fs.raw("/~version");
    dir.mkdir()?;
    dir.child("file.txt")?.write_string(false, "not a number")?;

    assert_that!(file.version(false))
        .is_err_variant(historized_fs::Error::CorruptVersion(String::new()));

    Ok(())
}

#[rstest]
fn versioning_disabled(unversioned_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = unversioned_fs.write("/file.txt", "a")?;
    file.write_string(false, "b")?;

    assert_that!(file.version(false)?).is_equal_to(0);
    assert_that!(file.set_version(0)).is_ok();
    assert_that!(file.set_version(3))
        .is_err_variant(historized_fs::Error::Unsupported(String::new()));
    // Zero is always the current version, so one is always the next.
    file.write_string_for_version("c", 1)?;
    assert_that!(file.read_string()?).is_equal_to(String::from("c"));

    Ok(())
}

#[rstest]
fn objects_round_trip_with_version(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.node("/settings.bin");
    let settings = Settings {
        name: String::from("backup"),
        retries: 3,
    };

    file.write_object(&settings)?;
    file.write_object_for_version(&settings, 2)?;

    let (version, actual): (u64, Settings) = file.read_object_and_version()?;
    assert_that!(version).is_equal_to(2);
    assert_that!(actual).is_equal_to(settings);
    assert_that!(file.history_times()?.len()).is_equal_to(1);

    Ok(())
}

#[rstest]
fn garbage_object_fails_to_deserialize(test_fs: TestFs<MemoryStore>) -> anyhow::Result<()> {
    let file = test_fs.write("/settings.bin", "")?;

    assert_that!(file.read_object::<Settings>())
        .is_err_variant(historized_fs::Error::Deserialize);

    Ok(())
}
