use crate::calc;
use crate::ipc::error::{err, ledger_err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Opens the roster for one date. The date defaults to the focused date,
/// and opening records the date even before any mark lands on it.
fn handle_attendance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let requested = helpers::optional_str(req, "date").unwrap_or_else(|| ledger.selected_date.clone());
    let date = match ledger.open_date(&section_id, &requested) {
        Ok(d) => d,
        Err(e) => return ledger_err(&req.id, &e),
    };

    let Some(section) = ledger.find_section(&section_id) else {
        return err(&req.id, "not_found", "section not found", None);
    };
    let marks = section.attendance.get(&date);
    let rows: Vec<serde_json::Value> = section
        .students
        .iter()
        .map(|st| {
            json!({
                "studentId": st.id,
                "roll": st.roll,
                "name": st.name,
                "present": marks.and_then(|m| m.get(&st.id)).copied().unwrap_or(false),
            })
        })
        .collect();
    let total_classes = section.attendance.len();
    let selected_date = ledger.selected_date.clone();

    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "date": date,
            "selectedDate": selected_date,
            "totalClasses": total_classes,
            "rows": rows,
        }),
    )
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let date = match helpers::required_str(req, "date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let present = match helpers::required_bool(req, "present") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Err(e) = ledger.set_attendance(&section_id, &date, &student_id, present) {
        return ledger_err(&req.id, &e);
    }
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(
        &req.id,
        json!({
            "sectionId": section_id,
            "date": date.trim(),
            "studentId": student_id,
            "present": present,
        }),
    )
}

fn handle_attendance_bulk_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let date = match helpers::required_str(req, "date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let present = match helpers::required_bool(req, "present") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_ids = match helpers::required_str_array(req, "studentIds") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let marked = match ledger.bulk_mark(&section_id, &date, &student_ids, present) {
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
            "date": date.trim(),
            "marked": marked,
            "present": present,
        }),
    )
}

/// The focused date is a UI cursor, not a record: any string is accepted
/// and stored verbatim. Recording operations validate their own dates.
fn handle_attendance_select_date(state: &mut AppState, req: &Request) -> serde_json::Value {
    let date = match helpers::required_str(req, "date") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    ledger.select_date(&date);
    if let Some(resp) = helpers::persist(state, &req.id) {
        return resp;
    }
    ok(&req.id, json!({ "selectedDate": date }))
}

fn handle_attendance_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let section_id = match helpers::required_str(req, "sectionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(ledger) = state.ledger.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section) = ledger.find_section(&section_id) else {
        return err(&req.id, "not_found", "section not found", None);
    };

    let summary = calc::section_summary(section);
    match serde_json::to_value(&summary) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "bad_json", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.open" => Some(handle_attendance_open(state, req)),
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        "attendance.bulkMark" => Some(handle_attendance_bulk_mark(state, req)),
        "attendance.selectDate" => Some(handle_attendance_select_date(state, req)),
        "attendance.summary" => Some(handle_attendance_summary(state, req)),
        _ => None,
    }
}
