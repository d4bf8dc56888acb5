//! Integration tests for patch sets: loading, version gating and application

use seqpatch::config::{
    apply_patches, check_patches, load_from_path, load_from_str, ApplicationError, ConfigError,
    PatchResult,
};
use seqpatch::ir::{Instruction, InstructionStream, MemberRef, MethodBody, Opcode, Operand};
use seqpatch::seq::SequenceError;
use seqpatch::session::PatchSession;
use std::fs;
use tempfile::TempDir;

const START_HOOKS: &str = r#"
[meta]
name = "start-hooks"
description = "Call the loader before PLGlobal.Start returns"
version_range = ">=1.2.0, <2.0.0"

[[patches]]
id = "hook-start"
method = "PLGlobal.Start"
mode = "before"
target = [{ opcode = "ret" }]
patch = [
    { opcode = "ldstr", operand = { str = "mods" } },
    { opcode = "call", operand = { member = { handle = 0x0A000010, name = "Loader::Init" } } },
]

[[patches]]
id = "drop-splash"
method = "PLGlobal.Start"
mode = "replace"
check = "non_null"
target = [
    { opcode = "call", operand = { member = { handle = 0x0A000001 } } },
    { opcode = "pop" },
]
patch = [{ opcode = "nop" }]

[[patches]]
id = "network-hook"
method = "PLNetworkManager.Start"
target = [{ opcode = "ret" }]
patch = [{ opcode = "nop" }]
"#;

fn start_body() -> InstructionStream {
    vec![
        Instruction::new(Opcode::LoadArg),
        Instruction::with_operand(Opcode::Call, MemberRef::new(0x0A000001, "Splash::Show")),
        Instruction::new(Opcode::Pop),
        Instruction::new(Opcode::Return),
    ]
    .into()
}

fn opcodes(stream: &InstructionStream) -> Vec<Opcode> {
    stream.iter().map(|i| i.opcode).collect()
}

#[test]
fn test_apply_start_hooks() {
    let config = load_from_str(START_HOOKS).unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "1.4.2");
    assert_eq!(report.len(), 3);

    assert_eq!(report[0].0, "hook-start");
    assert!(matches!(
        report[0].1,
        Ok(PatchResult::Applied { occurrences: 1, len_delta: 2, .. })
    ));
    assert!(matches!(
        report[1].1,
        Ok(PatchResult::Applied { occurrences: 1, len_delta: -1, .. })
    ));
    assert!(matches!(report[2].1, Ok(PatchResult::SkippedMethod { .. })));

    assert_eq!(
        opcodes(&stream),
        vec![
            Opcode::LoadArg,
            Opcode::Nop,
            Opcode::LoadString,
            Opcode::Call,
            Opcode::Return
        ]
    );
    assert_eq!(
        stream[3].operand,
        Operand::Member(MemberRef::new(0x0A000010, "Loader::Init"))
    );
}

#[test]
fn test_version_outside_range_skips_set() {
    let config = load_from_str(START_HOOKS).unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "2.1.0");

    assert!(report
        .iter()
        .all(|(_, r)| matches!(r, Ok(PatchResult::SkippedVersion { .. }))));
    assert_eq!(stream, start_body());
}

#[test]
fn test_unparseable_host_version_is_an_error() {
    let config = load_from_str(START_HOOKS).unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "not-a-version");

    assert!(report
        .iter()
        .all(|(_, r)| matches!(r, Err(ApplicationError::Version(_)))));
    assert_eq!(stream, start_body());
}

#[test]
fn test_missing_target_is_informational() {
    let config = load_from_str(
        r#"
[meta]
name = "optional"

[[patches]]
id = "no-throw"
method = "PLGlobal.Start"
target = [{ opcode = "throw" }]
patch = [{ opcode = "nop" }]
"#,
    )
    .unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "1.0.0");

    assert!(matches!(report[0].1, Ok(PatchResult::NotFound { .. })));
    assert_eq!(stream, start_body());
}

#[test]
fn test_required_missing_target_fails() {
    let config = load_from_str(
        r#"
[meta]
name = "strict"

[[patches]]
id = "must-find-throw"
method = "PLGlobal.Start"
required = true
target = [{ opcode = "throw" }]
patch = [{ opcode = "nop" }]
"#,
    )
    .unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "1.0.0");

    match &report[0].1 {
        Err(ApplicationError::NotFound { patch_id, method }) => {
            assert_eq!(patch_id, "must-find-throw");
            assert_eq!(method, "PLGlobal.Start");
        }
        other => panic!("expected NotFound error, got {other:?}"),
    }
}

#[test]
fn test_all_occurrences() {
    let config = load_from_str(
        r#"
[meta]
name = "every-pop"

[[patches]]
id = "trace-pops"
method = "M"
all_occurrences = true
mode = "after"
target = [{ opcode = "pop" }]
patch = [{ opcode = "nop" }, { opcode = "pop" }]
"#,
    )
    .unwrap();
    let mut stream: InstructionStream = vec![
        Instruction::new(Opcode::Pop),
        Instruction::new(Opcode::Return),
        Instruction::new(Opcode::Pop),
    ]
    .into();

    let report = apply_patches(&config, "M", &mut stream, "1.0.0");

    // The inserted pops are not matched again.
    assert!(matches!(
        report[0].1,
        Ok(PatchResult::Applied { occurrences: 2, len_delta: 4, .. })
    ));
    assert_eq!(stream.len(), 7);
}

#[test]
fn test_check_patches_leaves_stream_alone() {
    let config = load_from_str(START_HOOKS).unwrap();
    let stream = start_body();

    let report = check_patches(&config, "PLGlobal.Start", &stream, "1.4.2");

    assert!(report[0].1.as_ref().unwrap().is_applied());
    assert_eq!(stream, start_body());
}

#[test]
fn test_load_from_path_and_round_trip_body() {
    let dir = TempDir::new().unwrap();
    let patch_path = dir.path().join("start-hooks.toml");
    fs::write(&patch_path, START_HOOKS).unwrap();

    let body_path = dir.path().join("start.json");
    let body = MethodBody {
        method: "PLGlobal.Start".to_string(),
        instructions: start_body(),
    };
    body.save(&body_path).unwrap();

    let config = load_from_path(&patch_path).unwrap();
    assert_eq!(config.meta.name, "start-hooks");

    let mut loaded = MethodBody::load(&body_path).unwrap();
    assert_eq!(loaded, body);

    apply_patches(&config, &loaded.method, &mut loaded.instructions, "1.2");
    loaded.save(&body_path).unwrap();

    let reloaded = MethodBody::load(&body_path).unwrap();
    assert_eq!(reloaded.instructions.len(), 5);
}

#[test]
fn test_invalid_set_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(
        &path,
        r#"
[meta]
name = "broken"

[[patches]]
id = "empty-target"
method = "M"
target = []
patch = [{ opcode = "nop" }]
"#,
    )
    .unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
    assert!(err.to_string().contains("broken.toml"));
}

const MIXED_MODES: &str = r#"
[meta]
name = "mixed"

[[patches]]
id = "good"
method = "PLGlobal.Start"
mode = "before"
target = [{ opcode = "ret" }]
patch = [{ opcode = "nop" }]

[[patches]]
id = "sideways"
method = "PLGlobal.Start"
mode = "sideways"
target = [{ opcode = "ret" }]
patch = [{ opcode = "nop" }]
"#;

#[test]
fn test_unsupported_mode_fails_only_its_patch() {
    let config = load_from_str(MIXED_MODES).unwrap();
    let mut stream = start_body();

    let report = apply_patches(&config, "PLGlobal.Start", &mut stream, "1.0.0");

    assert_eq!(report[0].0, "good");
    assert!(report[0].1.as_ref().unwrap().is_applied());
    match &report[1].1 {
        Err(ApplicationError::Sequence { patch_id, source }) => {
            assert_eq!(patch_id, "sideways");
            assert_eq!(
                *source,
                SequenceError::InvalidArgument {
                    argument: "patch_mode",
                    value: "sideways".to_string(),
                }
            );
        }
        other => panic!("expected InvalidArgument for 'sideways', got {other:?}"),
    }
    assert_eq!(stream.len(), start_body().len() + 1);
    assert_eq!(stream[3].opcode, Opcode::Nop);
}

#[test]
fn test_unsupported_mode_does_not_block_other_sets() {
    let dir = TempDir::new().unwrap();
    let mixed = dir.path().join("mixed.toml");
    let hooks = dir.path().join("start-hooks.toml");
    fs::write(&mixed, MIXED_MODES).unwrap();
    fs::write(&hooks, START_HOOKS).unwrap();

    let mut session = PatchSession::new("1.4.2");
    session.init_from_paths(&[mixed, hooks]).unwrap();

    let mut stream = start_body();
    let report = session.transpile("PLGlobal.Start", &mut stream).unwrap();
    let stats = session.teardown().unwrap();

    let ids: Vec<&str> = report.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["good", "sideways", "hook-start", "drop-splash"]);
    assert_eq!(stats.applied, 3);
    assert_eq!(stats.failed, 1);
}

#[test]
fn test_unknown_opcode_suggests_spelling() {
    let err = load_from_str(
        r#"
[meta]
name = "typo"

[[patches]]
id = "typo"
method = "M"
target = [{ opcode = "calll" }]
patch = [{ opcode = "nop" }]
"#,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::Toml { .. }));
    assert!(err.to_string().contains("did you mean 'call'"));
}

#[test]
fn test_shipped_mod_loader_set_applies_to_demo_body() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = load_from_path(root.join("patches/mod-loader.toml")).unwrap();
    let mut body = MethodBody::load(root.join("demos/PLGlobal.Start.json")).unwrap();
    let before = body.instructions.len();

    let report = apply_patches(&config, &body.method, &mut body.instructions, "1.0");

    assert!(report.iter().all(|(_, r)| r.as_ref().unwrap().is_applied()));
    // +2 for the loader call, -1 for the collapsed splash call.
    assert_eq!(body.instructions.len(), before + 1);
    assert_eq!(body.instructions[1].opcode, Opcode::Nop);

    // The label stays on the original ret, now after the inserted call.
    let ret = body.instructions.last().unwrap();
    assert_eq!(ret.opcode, Opcode::Return);
    assert!(ret.labels.contains(&seqpatch::ir::Label(1)));
    assert_eq!(body.instructions[body.instructions.len() - 2].opcode, Opcode::Call);
}
