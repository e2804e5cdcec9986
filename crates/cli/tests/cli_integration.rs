use std::process::{Command, Output};

fn fluentargs() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fluentargs"));
    cmd.env_remove("FLUENTARGS_SETTINGS").env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    fluentargs()
        .args(args)
        .output()
        .expect("failed to run fluentargs")
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

#[test]
fn help_lists_every_argument() {
    let out = run(&["--help"]);
    assert_success(&out, "fluentargs --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.starts_with("Greets people from the command line.")
            && stdout.contains("-h, --help")
            && stdout.contains("Show help information")
            && stdout.contains("-n, --name")
            && stdout.contains("Who to greet.")
            && stdout.contains("Possible values: plain, json"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn greets_with_defaults() {
    let out = run(&["--name", "beni"]);
    assert_success(&out, "fluentargs --name beni");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "Hello, beni!\n");
}

#[test]
fn greets_with_every_argument() {
    let out = run(&[
        "notes.txt",
        "-g",
        "Hi",
        "--age=28",
        "--name",
        "Ada",
        "-t",
        "a;b",
        "more.txt",
    ]);
    assert_success(&out, "fluentargs with all arguments");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "Hi, Ada! You are 28.\ntags: a, b\nfile: notes.txt\nfile: more.txt\n"
    );
}

#[test]
fn json_format_prints_a_document() {
    let out = run(&["--name", "beni", "--format", "json", "--tags", "x,y"]);
    assert_success(&out, "fluentargs --format json");
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is not JSON");
    assert_eq!(doc["name"], "beni");
    assert_eq!(doc["greeting"], "Hello");
    assert_eq!(doc["tags"], serde_json::json!(["x", "y"]));
}

#[test]
fn invalid_arguments_exit_with_usage_code() {
    let out = run(&["--age", "many", "--format", "xml"]);
    assert_eq!(out.status.code(), Some(2), "unexpected status {}", out.status);
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("missing required argument: --name")
            && stderr.contains("malformed value for --age")
            && stderr.contains("expected one of: plain, json")
            && stderr.contains("Run with --help to see available arguments."),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn validation_failures_are_reported() {
    let out = run(&["--name", "old", "--age", "200"]);
    assert_eq!(out.status.code(), Some(2), "unexpected status {}", out.status);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("invalid value '200' for --age: must be below 150"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn version_branch_needs_no_other_arguments() {
    let out = run(&["--version"]);
    assert_success(&out, "fluentargs --version");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        format!("fluentargs {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn settings_from_environment_switch_help_to_json() {
    let out = fluentargs()
        .env("FLUENTARGS_SETTINGS", r#"{"help-format":"json"}"#)
        .arg("-h")
        .output()
        .expect("failed to run fluentargs -h");
    assert_success(&out, "fluentargs -h with JSON help");
    let doc: serde_json::Value = serde_json::from_slice(&out.stdout).expect("help is not JSON");
    assert_eq!(doc["format-version"], 1);
    assert_eq!(doc["description"], "Greets people from the command line.");
    let aliases: Vec<&str> = doc["parameters"]
        .as_array()
        .expect("parameters array")
        .iter()
        .filter_map(|p| p["aliases"].as_array()?.last()?.as_str())
        .collect();
    assert!(aliases.contains(&"--name"), "unexpected aliases {aliases:?}");
}

#[test]
fn malformed_settings_are_rejected() {
    let out = fluentargs()
        .env("FLUENTARGS_SETTINGS", "{not json")
        .arg("--name")
        .arg("x")
        .output()
        .expect("failed to run fluentargs");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("FLUENTARGS_SETTINGS is not valid settings JSON"),
        "unexpected stderr:\n{stderr}"
    );
}
