//! End-to-end tests that drive the compiled agent binary over its real stdin/stderr pipe pair,
//! the same way a controller would. Commands and replies are built/parsed as raw CBOR values
//! here rather than through the crate's own types, since the binary exposes no library target.

use assert_cmd::Command;
use ciborium::value::{Integer, Value};

/// Must track `MAGIC_PACKET_MARKER`'s compiled-in default in `src/constants.rs`; these tests run
/// without setting `CMDBRIDGE_MAGIC_MARKER` at build time, so the default applies.
const MAGIC: &str = "-cmdbridge-packet-marker-";

fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

fn int(n: i64) -> Value {
    Value::Integer(Integer::from(n))
}

fn command(ty: &str, id: i64, fields: Vec<(&str, Value)>) -> Vec<u8> {
    let mut entries = vec![(text("Type"), text(ty)), (text("Id"), int(id))];
    entries.extend(fields.into_iter().map(|(k, v)| (text(k), v)));
    let mut buf = Vec::new();
    ciborium::into_writer(&Value::Map(entries), &mut buf).unwrap();
    buf
}

/// A command whose payload is one nested sub-object keyed by its own field-per-kind name, e.g.
/// `{Type:"copyfile", Id:10, CopyFile:{Source:.., Target:..}}` rather than flattened siblings of
/// `Type`/`Id` — the layout `copyfile`/`createsymlink`/`renamefile`/`setpermissions`/`signal`
/// share with the original.
fn nested_command(ty: &str, id: i64, payload_key: &str, fields: Vec<(&str, Value)>) -> Vec<u8> {
    let nested = Value::Map(fields.into_iter().map(|(k, v)| (text(k), v)).collect());
    command(ty, id, vec![(payload_key, nested)])
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Map(entries) => entries.iter().find_map(|(k, v)| match k {
            Value::Text(t) if t == key => Some(v),
            _ => None,
        }),
        _ => None,
    }
}

fn reply_type(value: &Value) -> &str {
    match field(value, "Type") {
        Some(Value::Text(t)) => t,
        other => panic!("reply missing a Type field: {other:?}"),
    }
}

fn reply_id(value: &Value) -> i64 {
    match field(value, "Id") {
        Some(Value::Integer(n)) => i128::from(*n) as i64,
        other => panic!("reply missing an Id field: {other:?}"),
    }
}

/// Splits a raw stderr byte stream into its framed CBOR payloads and decodes each one.
fn parse_frames(stderr: &[u8]) -> Vec<Value> {
    let magic = MAGIC.as_bytes();
    let mut replies = Vec::new();
    let mut pos = 0;
    while pos < stderr.len() {
        assert!(
            stderr[pos..].starts_with(magic),
            "expected a magic marker at offset {pos}, got {:?}",
            &stderr[pos..(pos + magic.len()).min(stderr.len())]
        );
        pos += magic.len();
        let len = u32::from_be_bytes(stderr[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        let payload = &stderr[pos..pos + len];
        pos += len;
        replies.push(ciborium::de::from_reader(payload).unwrap());
    }
    replies
}

fn agent() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

#[test]
fn createdir_writefile_readfile_stat_then_exit_round_trips() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = temp.join("sub");
    let file = dir.join("hello.txt");

    let mut input = Vec::new();
    input.extend(command("createdir", 1, vec![("Path", text(dir.to_str().unwrap()))]));
    input.extend(command(
        "writefile",
        2,
        vec![("Path", text(file.to_str().unwrap())), ("Data", Value::Bytes(b"hello".to_vec()))],
    ));
    input.extend(command("readfile", 3, vec![("Path", text(file.to_str().unwrap()))]));
    input.extend(command("stat", 4, vec![("Path", text(file.to_str().unwrap()))]));
    input.extend(command("exit", 5, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let output = assert.get_output();
    let replies = parse_frames(&output.stderr);

    assert_eq!(replies.len(), 4, "exit produces no reply of its own");

    let by_id = |id: i64| replies.iter().find(|r| reply_id(r) == id).unwrap();
    assert_eq!(reply_type(by_id(1)), "createdirresult");
    assert_eq!(reply_type(by_id(2)), "writefileresult");

    let read = by_id(3);
    assert_eq!(reply_type(read), "readfileresult");
    match field(read, "Data") {
        Some(Value::Bytes(bytes)) => assert_eq!(bytes, b"hello"),
        other => panic!("expected byte data, got {other:?}"),
    }

    let stat = by_id(4);
    assert_eq!(reply_type(stat), "statresult");
    assert_eq!(field(stat, "IsFile"), Some(&Value::Bool(true)));
    assert_eq!(field(stat, "IsDir"), Some(&Value::Bool(false)));
}

#[test]
fn copyfile_then_renamefile_with_nested_payloads_round_trip() {
    let temp = assert_fs::TempDir::new().unwrap();
    let src = temp.join("src");
    let dst1 = temp.join("dst1");
    let dst2 = temp.join("dst2");
    std::fs::write(&src, b"hello").unwrap();

    let mut input = Vec::new();
    input.extend(nested_command(
        "copyfile",
        10,
        "CopyFile",
        vec![("Source", text(src.to_str().unwrap())), ("Target", text(dst1.to_str().unwrap()))],
    ));
    input.extend(nested_command(
        "renamefile",
        11,
        "RenameFile",
        vec![("Source", text(dst1.to_str().unwrap())), ("Target", text(dst2.to_str().unwrap()))],
    ));
    input.extend(command("exit", 12, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 2);
    let by_id = |id: i64| replies.iter().find(|r| reply_id(r) == id).unwrap();
    assert_eq!(reply_type(by_id(10)), "copyfileresult");
    assert_eq!(reply_type(by_id(11)), "renamefileresult");

    assert!(!dst1.exists());
    assert_eq!(std::fs::read(&dst2).unwrap(), b"hello");
}

#[test]
fn ping_and_exit_produce_no_reply() {
    let mut input = Vec::new();
    input.extend(command("ping", 1, vec![]));
    input.extend(command("is", 2, vec![("Path", text("/")), ("Kind", text("dir"))]));
    input.extend(command("exit", 3, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 1);
    assert_eq!(reply_type(&replies[0]), "isresult");
    assert_eq!(field(&replies[0], "Result"), Some(&Value::Bool(true)));
}

#[test]
fn unknown_command_type_yields_unknown_command_error() {
    let input = command("levitate", 7, vec![]);

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 1);
    assert_eq!(reply_type(&replies[0]), "error");
    assert_eq!(field(&replies[0], "ErrorType"), Some(&Value::Text("unknown_command".into())));
    assert_eq!(reply_id(&replies[0]), 7);
}

#[test]
fn signal_with_unrecognized_name_is_an_error_not_a_silent_success() {
    let mut input = Vec::new();
    input.extend(nested_command("signal", 1, "Signal", vec![("Pid", int(1)), ("Signal", text("levitate"))]));
    input.extend(command("exit", 2, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 1);
    assert_eq!(reply_type(&replies[0]), "error");
    assert_eq!(field(&replies[0], "ErrorType"), Some(&Value::Text("InvalidInput".into())));
}

#[test]
fn createtempfile_under_an_existing_directory_uses_it_as_the_destination() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut input = Vec::new();
    input.extend(command("createtempfile", 1, vec![("Path", text(temp.to_str().unwrap()))]));
    input.extend(command("exit", 2, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 1);
    assert_eq!(reply_type(&replies[0]), "createtempfileresult");
    let path = match field(&replies[0], "Path") {
        Some(Value::Text(path)) => path,
        other => panic!("expected a path string, got {other:?}"),
    };
    assert!(
        std::path::Path::new(path).starts_with(temp.path()),
        "expected {path} to live under {}",
        temp.path().display()
    );
}

#[test]
fn createtempfile_under_a_missing_path_uses_its_basename_as_a_template() {
    let temp = assert_fs::TempDir::new().unwrap();
    let requested = temp.join("scratch-");

    let mut input = Vec::new();
    input.extend(command("createtempfile", 1, vec![("Path", text(requested.to_str().unwrap()))]));
    input.extend(command("exit", 2, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    let path = match field(&replies[0], "Path") {
        Some(Value::Text(path)) => path.clone(),
        other => panic!("expected a path string, got {other:?}"),
    };
    let file_name = std::path::Path::new(&path).file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("scratch-"), "expected generated name to carry the template prefix, got {file_name}");
}

#[test]
fn stat_of_a_missing_path_is_a_not_found_error() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.join("does-not-exist");

    let mut input = Vec::new();
    input.extend(command("stat", 1, vec![("Path", text(missing.to_str().unwrap()))]));
    input.extend(command("exit", 2, vec![]));

    let assert = agent().write_stdin(input).assert().success();
    let replies = parse_frames(&assert.get_output().stderr);

    assert_eq!(replies.len(), 1);
    assert_eq!(reply_type(&replies[0]), "error");
    assert_eq!(field(&replies[0], "ErrorType"), Some(&Value::Text("NotFound".into())));
}

#[test]
fn write_mode_emits_the_built_in_script_as_bare_cbor_commands() {
    let assert = agent().arg("--write").assert().success();
    let stdout = &assert.get_output().stdout;
    assert!(!stdout.is_empty());

    let first: Value = ciborium::de::from_reader(stdout.as_slice()).unwrap();
    assert_eq!(field(&first, "Type"), Some(&Value::Text("ping".into())));
}

#[test]
fn test_mode_runs_the_built_in_script_and_prints_human_readable_replies() {
    let assert = agent().arg("--test").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("WriteFileResult"), "expected pretty-printed output to name a reply variant:\n{stdout}");
    assert!(stdout.contains("RemoveAllResult"), "expected the script's final cleanup step to show up:\n{stdout}");
}
