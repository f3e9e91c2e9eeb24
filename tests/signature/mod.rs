// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use luadef::*;
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub note: String,
    pub source: String,
    pub name: String,
    pub line: u32,
    pub last: u32,
    pub params: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", &case.note);

        match recover_params(&case.source, &case.name, case.line, case.last) {
            Ok(params) => match (&case.params, &case.error) {
                (Some(expected), _) => assert_eq!(&params, expected, "{}", case.note),
                (None, Some(expected)) => {
                    bail!("expected error `{}` but recovered {:?}", expected, params)
                }
                (None, None) => bail!("case {} expects neither params nor error", case.note),
            },
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                }
                _ => return Err(actual.into()),
            },
        }

        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "run a single yaml file passed on the command line"]
fn one_yaml() -> Result<()> {
    let mut file = String::default();
    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
            break;
        }
    }

    if file.is_empty() {
        bail!("missing yaml test file");
    }

    yaml_test(file.as_str())
}

#[test_resources("tests/signature/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn fatal_errors() {
    let divergent = recover_params("function f(a) end do function f(x, y) end end", "f", 1, 1);
    assert!(matches!(
        divergent,
        Err(SchemaError::DivergentParameters { .. })
    ));
    assert!(divergent.unwrap_err().is_fatal());

    let range = recover_params("function f(a) end", "f", 2, 3).unwrap_err();
    assert!(matches!(range, SchemaError::LineRange { lines: 1, .. }));
    assert!(!range.is_fatal());
}
