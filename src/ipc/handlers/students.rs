use crate::ipc::error::{err, ledger_err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if ledger.subject(&subject_id).is_none() {
        return err(&req.id, "not_found", "subject not found", None);
    }
    let Some(section) = ledger.section_in(&subject_id, &section_id) else {
        return err(&req.id, "not_found", "section not found", None);
    };

    // Roster order is insertion order; the front end renders it as-is.
    let students: Vec<serde_json::Value> = section
        .students
        .iter()
        .map(|st| json!({ "id": st.id, "roll": st.roll, "name": st.name }))
        .collect();

    ok(&req.id, json!({ "students": students }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let roll = match helpers::required_str(req, "roll") {
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

    let student_id = match ledger.add_student(&subject_id, &section_id, &roll, &name) {
        Ok(id) => id,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "roll": roll.trim(),
            "name": name.trim(),
        }),
    )
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match helpers::required_str(req, "subjectId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let purged_dates = match ledger.remove_student(&subject_id, &section_id, &student_id) {
        Ok(count) => count,
        Err(e) => return ledger_err(&req.id, &e),
    };
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "purgedDates": purged_dates,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
