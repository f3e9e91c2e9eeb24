// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use luadef::*;

const SCRIPTS: &str = "tests/extractor/scripts";

fn scripts_config() -> Config {
    Config {
        scripts_root: SCRIPTS.into(),
        entry_scripts: vec!["main.lua".to_string()],
        init_calls: vec!["Game.Init()".to_string()],
        reject_paths: vec!["Scripts/Quests/".to_string()],
        ..Config::default()
    }
}

fn params(root: &Root, name: &str) -> Vec<String> {
    let definition = root
        .get(name)
        .unwrap_or_else(|| panic!("{name} is not registered"));
    definition
        .as_function()
        .unwrap_or_else(|| panic!("{name} is not a function"))
        .para
        .iter()
        .map(|p| p.clone().unwrap_or_default())
        .collect()
}

fn lua_strings(env: &mlua::Table, key: &str) -> Result<Vec<String>> {
    Ok(env.get::<Vec<String>>(key).map_err(SchemaError::from)?)
}

fn field<'a>(root: &'a Root, name: &str, key: &str) -> &'a PolyType {
    &root.get(name).unwrap().fields().unwrap()[key]
}

#[test]
fn added_source_functions() -> Result<()> {
    let mut extractor = Extractor::new(Config::default())?;
    extractor.add_source(
        "Scripts/player.lua",
        "Player = {}\nfunction Player.Spawn(x, y, z)\nend\n",
    )?;

    let root = extractor.extract()?;
    assert_eq!(params(&root, "global-Player.Spawn"), ["x", "y", "z"]);

    let spawn = root.get("global-Player.Spawn").unwrap();
    assert_eq!(
        spawn.origin("FileOrigin"),
        Some(&Origin::file("Scripts/player.lua"))
    );
    assert_eq!(
        spawn.origin("ScriptOrigin"),
        Some(&Origin::script(Some(2), Some(3)))
    );
    assert_eq!(spawn.global_path(), Some("Player.Spawn"));
    Ok(())
}

#[test]
fn runtime_builtins() -> Result<()> {
    let mut extractor = Extractor::new(Config::default())?;
    extractor.exec("Custom = { answer = 1.5 }")?;

    let root = extractor.extract()?;
    let math = root.get("global-math").unwrap();
    assert_eq!(math.origin("BuiltinOrigin"), Some(&Origin::builtin(false)));

    let floor = root.get("global-math.floor").unwrap();
    assert!(floor.is_builtin());
    assert!(floor.as_function().unwrap().para.is_empty());

    let custom = root.get("global-Custom").unwrap();
    assert!(!custom.is_builtin());
    assert!(field(&root, "global-Custom", "answer").contains(&TypeTag::lua(LuaType::Number)));
    Ok(())
}

#[test]
fn environment_refers_to_itself() -> Result<()> {
    let extractor = Extractor::new(Config::default())?;
    let root = extractor.extract()?;

    assert!(!root.contains("global-_G._G"));
    assert_eq!(
        field(&root, "global-_G", "_G").aliases().collect::<Vec<_>>(),
        ["global-_G"]
    );
    Ok(())
}

#[test]
fn scripts_and_init_calls() -> Result<()> {
    let mut extractor = Extractor::new(scripts_config())?;
    extractor.run()?;
    let root = extractor.extract()?;

    assert_eq!(params(&root, "global-Game.Start"), ["level", "difficulty"]);
    assert_eq!(params(&root, "global-Common.Clamp"), ["value", "lo", "hi"]);
    assert_eq!(params(&root, "global-Common.Describe"), ["verbose"]);
    assert_eq!(
        params(&root, "global-Common.Handlers.OnTick"),
        ["self", "delta"]
    );

    let clamp = root.get("global-Common.Clamp").unwrap();
    assert_eq!(
        clamp.origin("FileOrigin"),
        Some(&Origin::file("Scripts/common.lua"))
    );

    assert!(field(&root, "global-Game", "version").contains(&TypeTag::lua(LuaType::Number)));
    assert!(field(&root, "global-Game", "title").contains(&TypeTag::lua(LuaType::String)));
    // Set by the init call.
    assert!(field(&root, "global-Game", "ready").contains(&TypeTag::lua(LuaType::Boolean)));

    // Rejected by path prefix.
    assert!(!root.contains("global-Secret"));
    Ok(())
}

#[test]
fn host_api_can_be_disabled() -> Result<()> {
    let config = Config {
        host_api: false,
        ..Config::default()
    };
    let extractor = Extractor::new(config)?;
    let root = extractor.extract()?;
    assert!(!root.contains("global-Script"));
    assert!(!root.contains("global-System"));

    let extractor = Extractor::new(Config::default())?;
    let root = extractor.extract()?;
    assert!(root.contains("global-Script.ReloadScript"));
    assert!(root.contains("global-System.ScanDirectory"));
    assert!(
        field(&root, "global-_G", "SCANDIR_FILES").contains(&TypeTag::lua(LuaType::Integer))
            || field(&root, "global-_G", "SCANDIR_FILES")
                .contains(&TypeTag::lua(LuaType::Number))
    );
    Ok(())
}

#[test]
fn scan_directory() -> Result<()> {
    let mut extractor = Extractor::new(scripts_config())?;
    extractor.exec(
        r#"
        Files = System.ScanDirectory("Scripts", SCANDIR_FILES)
        Dirs = System.ScanDirectory("Scripts", SCANDIR_SUBDIRS)
        Both = System.ScanDirectory("Scripts")
        Hidden = System.ScanDirectory("Scripts/Quests/")
        Missing = System.ScanDirectory("Nowhere")
        "#,
    )?;

    let env = extractor.runtime().env();
    assert_eq!(lua_strings(env, "Files")?, ["common.lua"]);
    assert_eq!(lua_strings(env, "Dirs")?, ["Quests"]);
    assert_eq!(lua_strings(env, "Both")?, ["Quests", "common.lua"]);
    assert!(lua_strings(env, "Hidden")?.is_empty());
    assert!(lua_strings(env, "Missing")?.is_empty());
    Ok(())
}

#[test]
fn script_errors_propagate() -> Result<()> {
    let mut extractor = Extractor::new(Config::default())?;
    let err = extractor.exec("error('boom')").unwrap_err();
    match err.downcast_ref::<SchemaError>() {
        Some(SchemaError::Lua(message)) => assert!(message.contains("boom")),
        other => panic!("unexpected error {other:?}"),
    }

    let err = extractor
        .add_source("broken.lua", "function (")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::Lua(_))
    ));
    Ok(())
}

#[test]
fn rebound_environment_name() -> Result<()> {
    let mut extractor = Extractor::new(Config::default())?;
    extractor.exec("_G = { x = 1.5 }")?;

    let root = extractor.extract()?;
    assert!(root.contains("global-_G"));
    assert!(field(&root, r#"global-_G["_G"]"#, "x").contains(&TypeTag::lua(LuaType::Number)));
    assert_eq!(
        field(&root, "global-_G", "_G").aliases().collect::<Vec<_>>(),
        [r#"global-_G["_G"]"#]
    );
    Ok(())
}

#[test]
fn extraction_is_deterministic() -> Result<()> {
    let mut first = Extractor::new(scripts_config())?;
    first.run()?;
    let mut second = Extractor::new(scripts_config())?;
    second.run()?;

    let a = first.extract()?;
    let b = second.extract()?;
    assert_eq!(a, b);
    assert_eq!(a.to_json_str()?, b.to_json_str()?);
    Ok(())
}
