// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{Context, Result};
use clap::Parser;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extraction settings. json or yaml.
    #[arg(long, short, value_name = "luadef.yaml")]
    config: Option<String>,

    /// Scripts root. Overrides the config file.
    #[arg(long, short)]
    root: Option<String>,

    /// Entry scripts, relative to the scripts root. Appended to the configured ones.
    #[arg(long, short, value_name = "main.lua")]
    script: Vec<String>,

    /// Lua snippets run after the entry scripts.
    #[arg(long, short)]
    exec: Vec<String>,

    /// Hand-written schema documents folded into the extracted one.
    #[arg(long, short, value_name = "annotations.json")]
    merge: Vec<String>,

    /// Output file. Defaults to stdout.
    #[arg(long, short, value_name = "schema.json")]
    output: Option<String>,

    /// Mark runtime-provided values as visible.
    #[arg(long)]
    show_builtins: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(file) => luadef::Config::from_file(file)?,
        None => luadef::Config::default(),
    };
    if let Some(root) = cli.root {
        config.scripts_root = root.into();
    }
    config.entry_scripts.extend(cli.script);
    config.init_calls.extend(cli.exec);
    config.show_builtins |= cli.show_builtins;

    let mut extractor = luadef::Extractor::new(config)?;
    extractor.run()?;
    let mut root = extractor.extract()?;

    for file in &cli.merge {
        let json =
            std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
        root.absorb_root(luadef::Root::from_json_str(&json)?)?;
    }

    let json = root.to_json_str()?;
    match &cli.output {
        Some(file) => {
            std::fs::write(file, json).with_context(|| format!("Failed to write {file}"))?
        }
        None => println!("{json}"),
    }
    Ok(())
}
