// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recovery of declared parameter names.
//!
//! The runtime only knows that a value is callable and on which lines it was defined.
//! The parameter names live in the source text, so the line range is sliced out,
//! parsed, and every function found in it is inspected.

use full_moon::ast::{self, Ast, Block, FunctionBody};
use full_moon::visitors::{Visitor, VisitorMut};
use indexmap::IndexMap;
use log::debug;

use crate::error::SchemaError;

/// Empties every function body so that nested closures are not mistaken for the outer function.
struct BodyStripper;

impl VisitorMut for BodyStripper {
    fn visit_function_body(&mut self, body: FunctionBody) -> FunctionBody {
        body.with_block(Block::new())
    }
}

struct Candidates<'a> {
    // Used for anonymous functions.
    fallback: &'a str,
    // Name of the declaration whose body is visited next.
    pending: Option<String>,
    found: IndexMap<String, Vec<String>>,
    conflict: Option<SchemaError>,
}

impl<'a> Candidates<'a> {
    fn new(fallback: &'a str) -> Self {
        Self {
            fallback,
            pending: None,
            found: IndexMap::new(),
            conflict: None,
        }
    }

    fn record(&mut self, name: String, params: Vec<String>) {
        if self.conflict.is_some() {
            return;
        }
        match self.found.get(&name) {
            Some(existing) if *existing != params => {
                self.conflict = Some(SchemaError::DivergentParameters {
                    first: existing.join(", "),
                    second: params.join(", "),
                    name,
                });
            }
            Some(_) => (),
            None => {
                self.found.insert(name, params);
            }
        }
    }
}

// Token text without the surrounding trivia, so comments never leak into names.
fn function_name(name: &ast::FunctionName) -> String {
    let mut text = name
        .names()
        .iter()
        .map(|t| t.token().to_string())
        .collect::<Vec<_>>()
        .join(".");
    if let Some(method) = name.method_name() {
        text.push(':');
        text.push_str(&method.token().to_string());
    }
    text
}

fn param_text(param: &ast::Parameter) -> String {
    match param {
        ast::Parameter::Name(token) | ast::Parameter::Ellipsis(token) => token.token().to_string(),
        other => other.to_string().split_whitespace().collect(),
    }
}

impl Visitor for Candidates<'_> {
    fn visit_function_declaration(&mut self, node: &ast::FunctionDeclaration) {
        self.pending = Some(function_name(node.name()));
    }

    fn visit_local_function(&mut self, node: &ast::LocalFunction) {
        self.pending = Some(node.name().token().to_string());
    }

    fn visit_function_body(&mut self, body: &FunctionBody) {
        let name = match self.pending.take() {
            Some(name) => name,
            None => self.fallback.to_string(),
        };
        let params = body.parameters().iter().map(param_text).collect();
        self.record(name, params);
    }
}

fn parse_slice(code: &str) -> Result<Ast, String> {
    full_moon::parse(code).map_err(|errors| {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

/// Parameter names, in declared order, of the function `name` defined on lines `line..=last`.
pub fn recover_params(
    contents: &str,
    name: &str,
    line: u32,
    last: u32,
) -> Result<Vec<String>, SchemaError> {
    let lines: Vec<&str> = contents.split('\n').collect();
    if line == 0 || last < line || last as usize > lines.len() {
        return Err(SchemaError::LineRange {
            name: name.to_string(),
            line,
            last,
            lines: lines.len(),
        });
    }
    let slice = lines[line as usize - 1..last as usize].join("\n");

    // Functions declared as table constructor fields only parse inside a constructor.
    let ast = match parse_slice(&slice) {
        Ok(ast) => ast,
        Err(message) => match parse_slice(&format!("local _ = {{\n{slice}\n}}")) {
            Ok(ast) => ast,
            Err(_) => {
                return Err(SchemaError::SourceParse {
                    name: name.to_string(),
                    line,
                    last,
                    message,
                })
            }
        },
    };

    let ast = BodyStripper.visit_ast(ast);
    let mut candidates = Candidates::new(name);
    candidates.visit_ast(&ast);
    if let Some(conflict) = candidates.conflict {
        return Err(conflict);
    }

    let params = select(name, candidates.found)?;
    debug!("recovered {name}({})", params.join(", "));
    Ok(params)
}

fn select(name: &str, found: IndexMap<String, Vec<String>>) -> Result<Vec<String>, SchemaError> {
    if found.len() <= 1 {
        return Ok(found.into_values().next().unwrap_or_default());
    }

    // `function T:m()` is reached as `T.m`.
    if let Some((_, params)) = found.iter().find(|(n, _)| n.replace(':', ".") == name) {
        return Ok(params.clone());
    }

    let mut tuples = found.values();
    if let Some(first) = tuples.next() {
        if tuples.all(|t| t == first) {
            return Ok(first.clone());
        }
    }

    Err(SchemaError::AmbiguousParameters {
        name: name.to_string(),
        candidates: found.into_keys().collect(),
    })
}
