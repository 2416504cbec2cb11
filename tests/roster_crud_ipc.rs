use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn raw_request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = raw_request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = raw_request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
        .to_string()
}

#[test]
fn subject_lifecycle_with_duplicate_and_rename_rules() {
    let workspace = temp_dir("roster-subjects-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // Everything is gated on a workspace.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "0",
        "subjects.create",
        json!({ "name": "Math" }),
    );
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "name": "  Math  " }),
    );
    let math_id = created
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();
    assert_eq!(created.get("name").and_then(|v| v.as_str()), Some("Math"));

    // Names collide case-insensitively, whitespace ignored.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "name": "math" }),
    );
    assert_eq!(code, "duplicate_name");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.create",
        json!({ "name": "   " }),
    );
    assert_eq!(code, "validation");

    let listed = request_ok(&mut stdin, &mut reader, "5", "subjects.list", json!({}));
    let subjects = listed
        .get("subjects")
        .and_then(|v| v.as_array())
        .expect("subjects array");
    assert_eq!(subjects.len(), 1);
    assert_eq!(
        subjects[0].get("name").and_then(|v| v.as_str()),
        Some("Math")
    );
    assert_eq!(
        subjects[0].get("sectionCount").and_then(|v| v.as_u64()),
        Some(0)
    );
    // Creation focuses the new subject.
    assert_eq!(
        listed.get("selectedSubjectId").and_then(|v| v.as_str()),
        Some(math_id.as_str())
    );

    let physics = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.create",
        json!({ "name": "Physics" }),
    );
    let physics_id = physics
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();

    // Renaming onto another subject's name fails; re-casing your own is fine.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "subjects.rename",
        json!({ "subjectId": math_id, "name": "PHYSICS" }),
    );
    assert_eq!(code, "duplicate_name");
    let renamed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "subjects.rename",
        json!({ "subjectId": math_id, "name": "MATH" }),
    );
    assert_eq!(renamed.get("name").and_then(|v| v.as_str()), Some("MATH"));
    let code = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "subjects.rename",
        json!({ "subjectId": "missing", "name": "Chemistry" }),
    );
    assert_eq!(code, "not_found");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "subjects.delete",
        json!({ "subjectId": physics_id }),
    );
    assert_eq!(
        deleted.get("removedSections").and_then(|v| v.as_u64()),
        Some(0)
    );
    let code = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "subjects.delete",
        json!({ "subjectId": physics_id }),
    );
    assert_eq!(code, "not_found");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn section_selection_is_scoped_to_the_selected_subject() {
    let workspace = temp_dir("roster-sections-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let math = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "name": "Math" }),
    );
    let math_id = math
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "sections.create",
        json!({ "subjectId": math_id, "name": "A" }),
    );
    let section_a = created
        .get("sectionId")
        .and_then(|v| v.as_str())
        .expect("sectionId")
        .to_string();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "sections.create",
        json!({ "subjectId": math_id, "name": " a " }),
    );
    assert_eq!(code, "duplicate_name");

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "sections.select",
        json!({ "sectionId": section_a }),
    );
    assert_eq!(
        selected.get("selectedSectionId").and_then(|v| v.as_str()),
        Some(section_a.as_str())
    );

    // Creating another subject steals focus and resets the section focus,
    // so the Math section can no longer be selected until Math is again.
    let physics = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.create",
        json!({ "name": "Physics" }),
    );
    let physics_id = physics
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "sections.select",
        json!({ "sectionId": section_a }),
    );
    assert_eq!(code, "not_found");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "subjects.select",
        json!({ "subjectId": math_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "sections.select",
        json!({ "sectionId": section_a }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "sections.list",
        json!({ "subjectId": math_id }),
    );
    assert_eq!(
        listed.get("selectedSectionId").and_then(|v| v.as_str()),
        Some(section_a.as_str())
    );

    // A subject with sections and students reports the cascade counts.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "students.create",
        json!({
            "subjectId": math_id,
            "sectionId": section_a,
            "roll": "1",
            "name": "Alice"
        }),
    );
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "subjects.delete",
        json!({ "subjectId": math_id }),
    );
    assert_eq!(
        deleted.get("removedSections").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        deleted.get("removedStudents").and_then(|v| v.as_u64()),
        Some(1)
    );

    let listed = request_ok(&mut stdin, &mut reader, "13", "subjects.list", json!({}));
    let subjects = listed
        .get("subjects")
        .and_then(|v| v.as_array())
        .expect("subjects array");
    assert_eq!(subjects.len(), 1);
    assert_eq!(
        subjects[0].get("id").and_then(|v| v.as_str()),
        Some(physics_id.as_str())
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn section_delete_reports_student_count_and_clears_focus() {
    let workspace = temp_dir("roster-section-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "name": "History" }),
    );
    let subject_id = subject
        .get("subjectId")
        .and_then(|v| v.as_str())
        .expect("subjectId")
        .to_string();
    let section = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "sections.create",
        json!({ "subjectId": subject_id, "name": "B" }),
    );
    let section_id = section
        .get("sectionId")
        .and_then(|v| v.as_str())
        .expect("sectionId")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "sections.select",
        json!({ "sectionId": section_id }),
    );
    for (i, (roll, name)) in [("1", "Alice"), ("2", "Bob")].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("5-{}", i),
            "students.create",
            json!({
                "subjectId": subject_id,
                "sectionId": section_id,
                "roll": roll,
                "name": name
            }),
        );
    }

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "sections.delete",
        json!({ "subjectId": subject_id, "sectionId": section_id }),
    );
    assert_eq!(
        deleted.get("removedStudents").and_then(|v| v.as_u64()),
        Some(2)
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "sections.list",
        json!({ "subjectId": subject_id }),
    );
    assert_eq!(
        listed.get("sections").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
    assert!(listed
        .get("selectedSectionId")
        .map(|v| v.is_null())
        .unwrap_or(false));

    let _ = std::fs::remove_dir_all(workspace);
}
