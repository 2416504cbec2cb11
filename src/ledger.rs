use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Per-date marks for one section: date string -> student id -> present.
/// A student id missing from a date entry means absent for that date.
pub type AttendanceMap = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub roll: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub attendance: AttendanceMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NotFound(&'static str),
    DuplicateName { scope: &'static str, name: String },
    DuplicateRoll { roll: String },
    Validation(String),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound(_) => "not_found",
            LedgerError::DuplicateName { .. } => "duplicate_name",
            LedgerError::DuplicateRoll { .. } => "duplicate_roll",
            LedgerError::Validation(_) => "validation",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            LedgerError::NotFound(what) => Some(json!({ "entity": what })),
            LedgerError::DuplicateName { scope, name } => {
                Some(json!({ "scope": scope, "name": name }))
            }
            LedgerError::DuplicateRoll { roll } => Some(json!({ "roll": roll })),
            LedgerError::Validation(_) => None,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound(what) => write!(f, "{} not found", what),
            LedgerError::DuplicateName { scope, name } => {
                write!(f, "a {} named \"{}\" already exists", scope, name)
            }
            LedgerError::DuplicateRoll { roll } => {
                write!(f, "a student with roll \"{}\" already exists in this section", roll)
            }
            LedgerError::Validation(msg) => f.write_str(msg),
        }
    }
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn parse_date(date: &str) -> Result<String, LedgerError> {
    let t = date.trim();
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map(|_| t.to_string())
        .map_err(|_| LedgerError::Validation("date must be a YYYY-MM-DD calendar date".to_string()))
}

fn require_trimmed(value: &str, what: &str) -> Result<String, LedgerError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(LedgerError::Validation(format!("{} must not be empty", what)));
    }
    Ok(t.to_string())
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// The whole persisted state: the subject hierarchy plus which
/// subject/section/date the front end currently has focused. Selection ids
/// are weak references; operations re-resolve them on use and removal
/// clears them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub selected_subject_id: Option<String>,
    #[serde(default)]
    pub selected_section_id: Option<String>,
    #[serde(default = "today")]
    pub selected_date: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger {
            subjects: Vec::new(),
            selected_subject_id: None,
            selected_section_id: None,
            selected_date: today(),
        }
    }
}

impl Ledger {
    /// Repair state loaded from disk: drop selection ids that no longer
    /// resolve and replace a blank selected date with today.
    pub fn normalize(&mut self) {
        let subject_ok = self
            .selected_subject_id
            .as_deref()
            .map(|id| self.subject(id).is_some())
            .unwrap_or(false);
        if !subject_ok {
            self.selected_subject_id = None;
            self.selected_section_id = None;
        } else if let Some(sec_id) = self.selected_section_id.as_deref() {
            let subject_id = self.selected_subject_id.as_deref().unwrap_or_default();
            let in_selected = self
                .subject(subject_id)
                .map(|subj| subj.sections.iter().any(|s| s.id == sec_id))
                .unwrap_or(false);
            if !in_selected {
                self.selected_section_id = None;
            }
        }
        if self.selected_date.trim().is_empty() {
            self.selected_date = today();
        }
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    fn subject_mut(&mut self, id: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| s.id == id)
    }

    pub fn section_in(&self, subject_id: &str, section_id: &str) -> Option<&Section> {
        self.subject(subject_id)?
            .sections
            .iter()
            .find(|s| s.id == section_id)
    }

    fn section_in_mut(&mut self, subject_id: &str, section_id: &str) -> Option<&mut Section> {
        self.subject_mut(subject_id)?
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
    }

    /// Look a section up by id alone, anywhere in the hierarchy.
    pub fn find_section(&self, section_id: &str) -> Option<&Section> {
        self.subjects
            .iter()
            .flat_map(|subj| subj.sections.iter())
            .find(|s| s.id == section_id)
    }

    fn find_section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.subjects
            .iter_mut()
            .flat_map(|subj| subj.sections.iter_mut())
            .find(|s| s.id == section_id)
    }

    pub fn add_subject(&mut self, name: &str) -> Result<String, LedgerError> {
        let name = require_trimmed(name, "subject name")?;
        if self.subjects.iter().any(|s| same_name(&s.name, &name)) {
            return Err(LedgerError::DuplicateName {
                scope: "subject",
                name,
            });
        }
        let id = Uuid::new_v4().to_string();
        self.subjects.push(Subject {
            id: id.clone(),
            name,
            sections: Vec::new(),
        });
        // The new subject becomes the focused one, which always drops the
        // section focus.
        self.selected_subject_id = Some(id.clone());
        self.selected_section_id = None;
        Ok(id)
    }

    pub fn rename_subject(&mut self, id: &str, new_name: &str) -> Result<(), LedgerError> {
        let new_name = require_trimmed(new_name, "subject name")?;
        if self.subject(id).is_none() {
            return Err(LedgerError::NotFound("subject"));
        }
        let clash = self
            .subjects
            .iter()
            .any(|s| s.id != id && same_name(&s.name, &new_name));
        if clash {
            return Err(LedgerError::DuplicateName {
                scope: "subject",
                name: new_name,
            });
        }
        if let Some(subj) = self.subject_mut(id) {
            subj.name = new_name;
        }
        Ok(())
    }

    /// Returns how many sections and students went away with the subject.
    pub fn remove_subject(&mut self, id: &str) -> Result<(usize, usize), LedgerError> {
        let idx = self
            .subjects
            .iter()
            .position(|s| s.id == id)
            .ok_or(LedgerError::NotFound("subject"))?;
        let removed = self.subjects.remove(idx);
        let sections = removed.sections.len();
        let students = removed.sections.iter().map(|s| s.students.len()).sum();
        if self.selected_subject_id.as_deref() == Some(id) {
            self.selected_subject_id = None;
            self.selected_section_id = None;
        }
        Ok((sections, students))
    }

    pub fn select_subject(&mut self, id: &str) -> Result<(), LedgerError> {
        if self.subject(id).is_none() {
            return Err(LedgerError::NotFound("subject"));
        }
        self.selected_subject_id = Some(id.to_string());
        self.selected_section_id = None;
        Ok(())
    }

    pub fn add_section(&mut self, subject_id: &str, name: &str) -> Result<String, LedgerError> {
        let name = require_trimmed(name, "section name")?;
        let subj = self
            .subject_mut(subject_id)
            .ok_or(LedgerError::NotFound("subject"))?;
        if subj.sections.iter().any(|s| same_name(&s.name, &name)) {
            return Err(LedgerError::DuplicateName {
                scope: "section",
                name,
            });
        }
        let id = Uuid::new_v4().to_string();
        subj.sections.push(Section {
            id: id.clone(),
            name,
            students: Vec::new(),
            attendance: AttendanceMap::new(),
        });
        Ok(id)
    }

    /// Returns how many students went away with the section.
    pub fn remove_section(
        &mut self,
        subject_id: &str,
        section_id: &str,
    ) -> Result<usize, LedgerError> {
        let subj = self
            .subject_mut(subject_id)
            .ok_or(LedgerError::NotFound("subject"))?;
        let idx = subj
            .sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        let removed = subj.sections.remove(idx);
        if self.selected_section_id.as_deref() == Some(section_id) {
            self.selected_section_id = None;
        }
        Ok(removed.students.len())
    }

    pub fn select_section(&mut self, section_id: &str) -> Result<(), LedgerError> {
        let subject_id = self
            .selected_subject_id
            .clone()
            .ok_or(LedgerError::NotFound("section"))?;
        if self.section_in(&subject_id, section_id).is_none() {
            return Err(LedgerError::NotFound("section"));
        }
        self.selected_section_id = Some(section_id.to_string());
        Ok(())
    }

    pub fn add_student(
        &mut self,
        subject_id: &str,
        section_id: &str,
        roll: &str,
        name: &str,
    ) -> Result<String, LedgerError> {
        let roll = require_trimmed(roll, "student roll")?;
        let name = require_trimmed(name, "student name")?;
        if self.subject(subject_id).is_none() {
            return Err(LedgerError::NotFound("subject"));
        }
        let sec = self
            .section_in_mut(subject_id, section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        if sec.students.iter().any(|s| same_name(&s.roll, &roll)) {
            return Err(LedgerError::DuplicateRoll { roll });
        }
        let id = Uuid::new_v4().to_string();
        sec.students.push(Student {
            id: id.clone(),
            roll,
            name,
        });
        Ok(id)
    }

    /// Removes the student and scrubs its id from every recorded date.
    /// Returns the number of date entries that carried a mark for it.
    pub fn remove_student(
        &mut self,
        subject_id: &str,
        section_id: &str,
        student_id: &str,
    ) -> Result<usize, LedgerError> {
        if self.subject(subject_id).is_none() {
            return Err(LedgerError::NotFound("subject"));
        }
        let sec = self
            .section_in_mut(subject_id, section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        let idx = sec
            .students
            .iter()
            .position(|s| s.id == student_id)
            .ok_or(LedgerError::NotFound("student"))?;
        sec.students.remove(idx);
        let mut purged = 0usize;
        for marks in sec.attendance.values_mut() {
            if marks.remove(student_id).is_some() {
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// The "viewed" half of lazy date creation: opening a roster for a date
    /// records that date (empty) even before any mark is made, so it counts
    /// toward total classes from then on.
    pub fn open_date(&mut self, section_id: &str, date: &str) -> Result<String, LedgerError> {
        let date = parse_date(date)?;
        let sec = self
            .find_section_mut(section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        sec.attendance.entry(date.clone()).or_default();
        Ok(date)
    }

    pub fn set_attendance(
        &mut self,
        section_id: &str,
        date: &str,
        student_id: &str,
        present: bool,
    ) -> Result<(), LedgerError> {
        let date = parse_date(date)?;
        let sec = self
            .find_section_mut(section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        if !sec.students.iter().any(|s| s.id == student_id) {
            return Err(LedgerError::NotFound("student"));
        }
        sec.attendance
            .entry(date)
            .or_default()
            .insert(student_id.to_string(), present);
        Ok(())
    }

    /// Stamp one flag onto many students for one date, all or nothing:
    /// every id is checked against the section before the first write.
    pub fn bulk_mark(
        &mut self,
        section_id: &str,
        date: &str,
        student_ids: &[String],
        present: bool,
    ) -> Result<usize, LedgerError> {
        let date = parse_date(date)?;
        let sec = self
            .find_section_mut(section_id)
            .ok_or(LedgerError::NotFound("section"))?;
        for id in student_ids {
            if !sec.students.iter().any(|s| &s.id == id) {
                return Err(LedgerError::NotFound("student"));
            }
        }
        let marks = sec.attendance.entry(date).or_default();
        for id in student_ids {
            marks.insert(id.clone(), present);
        }
        Ok(student_ids.len())
    }

    /// Never fails: the date is kept verbatim and only checked by the
    /// operations that actually record something under it.
    pub fn select_date(&mut self, date: &str) {
        self.selected_date = date.to_string();
    }
}
