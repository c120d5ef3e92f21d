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

use std::sync::Arc;
use std::sync::Mutex;

use teelog::Error;
use teelog::Logger;
use teelog::append::Append;
use teelog::record::Record;

#[derive(Debug, Clone, Default)]
struct Callers {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Callers {
    fn last(&self) -> String {
        self.seen.lock().unwrap().pop().unwrap()
    }
}

impl Append for Callers {
    fn append(&self, record: &Record) -> Result<(), Error> {
        let caller = record.caller().map(|caller| caller.to_string());
        self.seen.lock().unwrap().push(caller.unwrap_or_default());
        Ok(())
    }
}

fn logger(skip: usize) -> (Logger, Callers) {
    let callers = Callers::default();
    let logger = teelog::builder()
        .dispatch(|d| d.append(callers.clone()))
        .add_caller()
        .caller_skip(skip)
        .build();
    (logger, callers)
}

#[inline(never)]
fn wrapped_warn(logger: &Logger) {
    logger.warn("wrapped", &[]);
}

#[test]
fn test_direct_call_site() {
    let (logger, callers) = logger(0);

    let line = line!() + 1;
    logger.info("direct", &[]);

    assert_eq!(
        callers.last(),
        format!("tests/caller_skip.rs:{line} caller_skip::test_direct_call_site")
    );
}

#[test]
fn test_wrapper_reported_without_skip() {
    let (logger, callers) = logger(0);

    wrapped_warn(&logger);

    let caller = callers.last();
    assert!(caller.starts_with("tests/caller_skip.rs:"), "{caller}");
    assert!(caller.ends_with(" caller_skip::wrapped_warn"), "{caller}");
}

#[test]
fn test_skip_reports_caller_of_wrapper() {
    let (logger, callers) = logger(1);

    wrapped_warn(&logger);

    let caller = callers.last();
    assert!(caller.starts_with("tests/caller_skip.rs:"), "{caller}");
    assert!(
        caller.ends_with(" caller_skip::test_skip_reports_caller_of_wrapper"),
        "{caller}"
    );
}

#[test]
fn test_named_child_keeps_skip() {
    let (logger, callers) = logger(1);
    let child = logger.named("disk");

    wrapped_warn(&child);

    let caller = callers.last();
    assert!(
        caller.ends_with(" caller_skip::test_named_child_keeps_skip"),
        "{caller}"
    );
}
