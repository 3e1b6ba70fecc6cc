//! Auxiliary subcommands: list, plan, scan-log, validate, doctor, config

mod test_support;

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;

use test_support::Project;

fn json_stdout(project: &Project, args: &[&str]) -> serde_json::Value {
    let output = project.command().args(args).output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_list_is_sorted_and_runs_nothing() {
    let project = Project::new(&[("answers-z.yaml", "ok"), ("answers-a.yaml", "ok")]);

    project
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout("examples/answers-a.yaml\nexamples/answers-z.yaml\n");

    assert!(project.installer_calls().is_empty());
}

#[test]
fn test_list_honours_pattern_flag() {
    let project = Project::new(&[("answers-tpm.yaml", "ok"), ("answers.yaml", "ok")]);

    let listed = json_stdout(&project, &["list", "--json", "--pattern", "examples/answers-*.yaml"]);
    assert_eq!(listed, serde_json::json!(["examples/answers-tpm.yaml"]));
}

#[test]
fn test_plan_describes_every_step() {
    let project = Project::new(&[("answers.yaml", "ok")]);

    let plan = json_stdout(&project, &["plan", "--json", "--timeout", "30"]);
    let steps = plan.as_array().unwrap();

    let stages: Vec<&str> = steps.iter().map(|s| s["stage"].as_str().unwrap()).collect();
    assert_eq!(
        stages,
        [
            "readiness",
            "unit_tests",
            "cleanup",
            "installer",
            "validation",
            "log_check",
            "leak_scan"
        ]
    );

    let installer = &steps[3];
    assert_eq!(installer["fixture"], "examples/answers.yaml");
    assert_eq!(installer["timeout_secs"], 30);
    let description = installer["description"].as_str().unwrap();
    assert!(description.contains("sh installer.sh --answers examples/answers.yaml"));
    assert!(description.contains("LANG=C.UTF-8"));
    assert!(project.installer_calls().is_empty());
}

#[test]
fn test_scan_log_reports_masked_leaks() {
    let project = Project::new(&[]);
    project.write(
        "debug.log",
        "Loaded answers: passw0rd\nanswers_action passw0rd\nuser typed passw0rd here\n",
    );

    project
        .command()
        .args(["scan-log", "debug.log"])
        .assert()
        .code(1)
        .stdout("user typed [REDACTED] here\npassword leaked into log file\n");
}

#[test]
fn test_scan_log_clean_file() {
    let project = Project::new(&[]);
    project.write("debug.log", "Loaded answers: passw0rd\nnothing else\n");

    project
        .command()
        .args(["scan-log", "debug.log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No leaks"));
}

#[test]
fn test_scan_log_missing_file() {
    let project = Project::new(&[]);

    project
        .command()
        .args(["scan-log", "missing.log"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_validate_command() {
    let project = Project::new(&[]);
    project.write(
        "good.conf",
        "storage:\n  config:\n  - {type: disk, id: d1, ptable: gpt}\n  - {type: partition, id: p1, device: d1, size: 1G}\n",
    );
    project.write(
        "bad.conf",
        "storage:\n  config:\n  - {type: partition, id: p1, device: d1, size: 1G}\n",
    );

    project
        .command()
        .args(["validate", "good.conf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 storage action(s) valid"));

    project
        .command()
        .args(["validate", "bad.conf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("d1"));
}

#[test]
fn test_config_precedence_and_sources() {
    let project = Project::new(&[]);
    project.write_config("\n[fixtures]\npattern = \"examples/*.yaml\"\n");

    let entries = json_stdout(&project, &["config", "--json", "--timeout", "5"]);
    let entry = |key: &str| {
        entries
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["key"] == key)
            .cloned()
            .unwrap()
    };

    assert_eq!(entry("installer.timeout_secs")["value"], "5");
    assert_eq!(entry("installer.timeout_secs")["source"], "cli");
    assert_eq!(entry("fixtures.pattern")["value"], "examples/*.yaml");
    assert_eq!(entry("fixtures.pattern")["source"], "config");
    assert_eq!(entry("installer.lang")["source"], "default");
    assert_eq!(entry("leak_scan.token")["value"], "[REDACTED]");
}

#[test]
fn test_doctor_json() {
    let project = Project::new(&[("answers.yaml", "ok")]);

    let output = json_stdout(&project, &["doctor", "--json"]);
    assert_eq!(output["ok"], true);

    let names: Vec<&str> = output["checks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"installer_program"));
    assert!(names.contains(&"fixtures"));
}

#[test]
fn test_doctor_fails_without_fixtures() {
    let project = Project::new(&[]);

    project
        .command()
        .arg("doctor")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[FAIL] fixtures"));
}
