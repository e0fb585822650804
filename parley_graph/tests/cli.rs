use std::fs;
use std::process::Command;

use parley_graph::Graph;
use serde_yaml::Value;

const CONVERSATION: &str = r#"__option__:
  theme: chat
  title: "{name}"
hello:
  npc: Greetings.
  player:
    - reply: "Tell me more"
      then: goto more
    - reply: "Pay"
      then: take coin 1
more:
  npc: ["There is nothing more."]
  player: []
"#;

fn parley() -> Command {
    Command::new(env!("CARGO_BIN_EXE_parley"))
}

#[test]
fn decode_then_encode_through_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let yaml_path = dir.path().join("hello.yml");
    let graph_path = dir.path().join("hello.json");
    let out_path = dir.path().join("hello.out.yml");
    fs::write(&yaml_path, CONVERSATION).expect("write fixture");

    let status = parley()
        .arg("decode")
        .arg(&yaml_path)
        .arg("--out")
        .arg(&graph_path)
        .status()
        .expect("run decode");
    assert!(status.success());

    let graph: Graph = serde_json::from_str(&fs::read_to_string(&graph_path).expect("read graph")).expect("graph json");
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);

    let status = parley()
        .arg("encode")
        .arg(&graph_path)
        .arg("--out")
        .arg(&out_path)
        .status()
        .expect("run encode");
    assert!(status.success());

    let written: Value = serde_yaml::from_str(&fs::read_to_string(&out_path).expect("read output")).expect("yaml");
    assert_eq!(written["hello"]["player"][0]["then"], Value::from("goto more"));
    assert_eq!(written["hello"]["player"][1]["then"], Value::from("take coin 1"));
    assert_eq!(written["hello"]["npc"], Value::Sequence(vec![Value::from("Greetings.")]));
}

#[test]
fn check_walks_directories_and_reports_broken_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let nested = dir.path().join("npcs");
    fs::create_dir_all(&nested).expect("mkdir");
    fs::write(nested.join("hello.yaml"), CONVERSATION).expect("write");
    fs::write(dir.path().join("notes.txt"), "not a conversation").expect("write");

    let output = parley().arg("check").arg(dir.path()).output().expect("run check");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    fs::write(dir.path().join("broken.yml"), "- just\n- a list\n").expect("write");
    let output = parley().arg("check").arg(dir.path()).output().expect("run check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.yml"));
}

#[test]
fn check_accepts_switch_sections_ahead_of_the_nodes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("switch.yml");
    let source = r#"__option__:
  theme: chat
conversation_switch_0:
  when:
    - if: "permission admin"
      open: hello
hello:
  npc: [Hi]
  player: []
404:
  npc:
    text: Lost
    delay: 3
  player: []
"#;
    fs::write(&path, source).expect("write");

    let output = parley().arg("check").arg(&path).output().expect("run check");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("npc of node '404'"));
}

#[test]
fn check_fails_when_saving_would_drop_a_goto() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("dangling.yml");
    // The goto target does not exist yet, so saving would drop it.
    fs::write(&path, "start:\n  npc: [Hi]\n  player:\n    - reply: Later\n      then: goto later\n").expect("write");

    let output = parley().arg("check").arg(&path).output().expect("run check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("missing node 'later'"));
}

#[test]
fn check_denies_lint_issues_on_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("odd.yml");
    fs::write(&path, "side-room:\n  npc: [Psst]\n  player: []\n").expect("write");

    let output = parley().arg("check").arg(&path).output().expect("run check");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("side-room"));

    let output = parley()
        .arg("check")
        .arg(&path)
        .arg("--deny-warnings")
        .output()
        .expect("run check");
    assert!(!output.status.success());
}
