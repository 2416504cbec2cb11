use crate::ipc::error::{err, ledger_err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_sections_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(subject) = ledger.subject(&subject_id) else {
        return err(&req.id, "not_found", "subject not found", None);
    };

    let sections: Vec<serde_json::Value> = subject
        .sections
        .iter()
        .map(|sec| {
            json!({
                "id": sec.id,
                "name": sec.name,
                "studentCount": sec.students.len(),
                "recordedDates": sec.attendance.len(),
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "sections": sections,
            "selectedSectionId": ledger.selected_section_id,
        }),
    )
}

fn handle_sections_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let section_id = match ledger.add_section(&subject_id, &name) {
        Ok(id) => id,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({ "sectionId": section_id, "name": name.trim() }),
    )
}

fn handle_sections_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let removed_students = match ledger.remove_section(&subject_id, &section_id) {
        Ok(count) => count,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "sectionId": section_id,
            "removedStudents": removed_students,
        }),
    )
}

fn handle_sections_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = ledger.select_section(&section_id) {
        return ledger_err(&req.id, &e);
    }
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(&req.id, json!({ "selectedSectionId": section_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sections.list" => Some(handle_sections_list(state, req)),
        "sections.create" => Some(handle_sections_create(state, req)),
        "sections.delete" => Some(handle_sections_delete(state, req)),
        "sections.select" => Some(handle_sections_select(state, req)),
        _ => None,
    }
}
