// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::thread;

use flate2::read::GzDecoder;
use tempfile::TempDir;
use teelog::ErrorKind;
use teelog::Logger;
use teelog::kv::Field;

fn read(dir: &Path, filename: &str) -> String {
    fs::read_to_string(dir.join(filename)).unwrap_or_default()
}

fn lines_with(content: &str, needle: &str) -> usize {
    content.lines().filter(|line| line.contains(needle)).count()
}

#[test]
fn test_directory_created_when_missing() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path().join("var").join("log").join("svc");
    assert!(!dir.exists());

    let _logger = teelog::new_file_logger(&dir, "svc", 10, 3, 7, 0, 0).unwrap();
    assert!(dir.is_dir());

    // an existing directory is fine too
    let _logger = teelog::new_file_logger(&dir, "svc", 10, 3, 7, 0, 0).unwrap();
}

#[test]
fn test_directory_creation_failure() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let path = temp_dir.path().join("taken");
    fs::write(&path, "a file, not a directory").unwrap();

    let err = teelog::new_file_logger(&path, "svc", 10, 3, 7, 0, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CreateDirectory);
    assert!(err.io_error().is_some());
}

#[test]
fn test_records_routed_by_level() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path();
    let logger = teelog::new_file_logger(dir, "svc", 10, 3, 7, 0, 0).unwrap();

    logger.debug("below minimum", &[]);
    logger.info("routine", &[]);
    logger.warn("worrying", &[]);
    logger.error("broken", &[]);
    logger.sync().unwrap();

    let all = read(dir, "svc.log");
    let high = read(dir, "error.svc.log");

    assert_eq!(lines_with(&all, "below minimum"), 0);
    assert_eq!(lines_with(&high, "below minimum"), 0);

    assert_eq!(lines_with(&all, "\tINFO\t"), 1);
    assert_eq!(lines_with(&high, "routine"), 0);

    for (level, msg) in [("\tWARN\t", "worrying"), ("\tERROR\t", "broken")] {
        assert_eq!(lines_with(&all, msg), 1);
        assert_eq!(lines_with(&high, msg), 1);
        assert_eq!(lines_with(&all, level), 1);
        assert_eq!(lines_with(&high, level), 1);
    }
}

#[test]
fn test_min_level_extremes() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path();

    let verbose = teelog::new_file_logger(dir, "verbose", 10, 3, 7, 0, -1).unwrap();
    verbose.debug("details", &[]);
    let content = read(dir, "verbose.log");
    assert_eq!(lines_with(&content, "\tDEBUG\t"), 1);
    assert_eq!(lines_with(&content, "details"), 1);

    // nothing passes the all-records file; the error file keeps its own threshold
    let silent = teelog::new_file_logger(dir, "silent", 10, 3, 7, 0, 6).unwrap();
    silent.error("still recorded", &[]);
    assert_eq!(read(dir, "silent.log"), "");
    assert_eq!(lines_with(&read(dir, "error.silent.log"), "still recorded"), 1);
}

#[inline(never)]
fn check_disk(logger: &Logger) {
    logger.warn("disk low", &[Field::new("free_mb", 12)]);
}

#[test]
fn test_warning_lands_once_in_each_file() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path();
    let logger = teelog::new_file_logger(dir, "svc", 10, 3, 7, 1, 0).unwrap();

    check_disk(&logger);
    logger.sync().unwrap();

    for filename in ["svc.log", "error.svc.log"] {
        let content = read(dir, filename);
        assert_eq!(content.lines().count(), 1, "{filename}: {content}");

        let columns = content.trim_end().split('\t').collect::<Vec<_>>();
        assert_eq!(columns.len(), 5, "{content}");
        assert_eq!(columns[1], "WARN");
        assert!(columns[2].starts_with("tests/file_logger.rs:"), "{content}");
        assert_eq!(columns[3], "disk low");
        assert_eq!(columns[4], r#"{"free_mb": 12}"#);
    }
}

#[test]
fn test_concurrent_loggers_keep_lines_intact() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path();

    let loggers = (0..2)
        .map(|_| teelog::new_file_logger(dir, "svc", 10, 3, 7, 0, 0).unwrap())
        .collect::<Vec<_>>();
    // both loggers open the file before they race
    for (writer, logger) in loggers.iter().enumerate() {
        logger.info(&format!("writer-{writer}-0"), &[]);
    }

    let handles = loggers
        .into_iter()
        .enumerate()
        .map(|(writer, logger)| {
            thread::spawn(move || {
                for i in 1..200 {
                    logger.info(&format!("writer-{writer}-{i}"), &[]);
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let content = read(dir, "svc.log");
    let mut seen = HashSet::new();
    for line in content.lines() {
        let columns = line.split('\t').collect::<Vec<_>>();
        assert_eq!(columns.len(), 4, "{line}");
        assert_eq!(columns[1], "INFO");
        assert!(seen.insert(columns[3].to_string()), "duplicated: {line}");
    }
    assert_eq!(seen.len(), 400);
}

#[test]
fn test_rotation_produces_gzip_backup() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path();
    let logger = teelog::new_file_logger(dir, "svc", 1, 2, 7, 0, 0).unwrap();

    let payload = "x".repeat(900);
    for i in 0..1400 {
        logger.info(&payload, &[Field::new("seq", i)]);
    }
    drop(logger);

    let backups = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.starts_with("svc-"))
        .collect::<Vec<_>>();
    assert_eq!(backups.len(), 1, "{backups:?}");
    assert!(backups[0].ends_with(".log.gz"), "{backups:?}");

    let mut rotated = String::new();
    GzDecoder::new(fs::File::open(dir.join(&backups[0])).unwrap())
        .read_to_string(&mut rotated)
        .unwrap();
    assert!(rotated.len() as u64 <= 1024 * 1024);
    assert!(rotated.lines().next().unwrap().ends_with(r#"{"seq": 0}"#));

    let active = read(dir, "svc.log");
    assert!((active.len() as u64) < 1024 * 1024);
    assert!(active.lines().last().unwrap().ends_with(r#"{"seq": 1399}"#));
    assert_eq!(rotated.lines().count() + active.lines().count(), 1400);
}
