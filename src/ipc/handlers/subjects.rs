use crate::ipc::error::{err, ledger_err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ledger) = state.ledger.as_ref() else {
        return ok(&req.id, json!({ "subjects": [], "selectedSubjectId": null }));
    };

    // Include basic counts so the UI can show a useful dashboard.
    let subjects: Vec<serde_json::Value> = ledger
        .subjects
        .iter()
        .map(|subj| {
            let student_count: usize = subj.sections.iter().map(|s| s.students.len()).sum();
            json!({
                "id": subj.id,
                "name": subj.name,
                "sectionCount": subj.sections.len(),
                "studentCount": student_count,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "subjects": subjects,
            "selectedSubjectId": ledger.selected_subject_id,
        }),
    )
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match helpers::required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let subject_id = match ledger.add_subject(&name) {
        Ok(id) => id,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({ "subjectId": subject_id, "name": name.trim() }),
    )
}

fn handle_subjects_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match helpers::required_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = ledger.rename_subject(&subject_id, &name) {
        return ledger_err(&req.id, &e);
    }
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({ "subjectId": subject_id, "name": name.trim() }),
    )
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let (removed_sections, removed_students) = match ledger.remove_subject(&subject_id) {
        Ok(counts) => counts,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "subjectId": subject_id,
            "removedSections": removed_sections,
            "removedStudents": removed_students,
        }),
    )
}

fn handle_subjects_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = ledger.select_subject(&subject_id) {
        return ledger_err(&req.id, &e);
    }
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "selectedSubjectId": subject_id,
            "selectedSectionId": null,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.rename" => Some(handle_subjects_rename(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        "subjects.select" => Some(handle_subjects_select(state, req)),
        _ => None,
    }
}
