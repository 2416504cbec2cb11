use crate::ledger::Section;
use serde::Serialize;

/// Percentages strictly below this are flagged for the front end.
pub const WARN_THRESHOLD_PERCENT: i64 = 75;

/// Whole-number percentage with half-up rounding, `floor(x + 0.5)` on the
/// scaled value. Zero recorded classes means 0, never a division by zero.
pub fn round_percent(present: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((100.0 * present as f64 / total as f64) + 0.5).floor() as i64
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTotals {
    pub student_id: String,
    pub roll: String,
    pub name: String,
    pub present: usize,
    pub total: usize,
    pub percent: i64,
    pub below_threshold: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub section_id: String,
    pub section_name: String,
    pub total_classes: usize,
    pub per_student: Vec<StudentTotals>,
}

/// Per-student attendance totals over every date recorded for the section.
/// The denominator is the count of recorded dates; a student with no entry
/// under some date is absent for it, same as an explicit `false`.
pub fn section_summary(section: &Section) -> SectionSummary {
    let total = section.attendance.len();
    let per_student = section
        .students
        .iter()
        .map(|student| {
            let present = section
                .attendance
                .values()
                .filter(|marks| marks.get(&student.id).copied().unwrap_or(false))
                .count();
            let percent = round_percent(present, total);
            StudentTotals {
                student_id: student.id.clone(),
                roll: student.roll.clone(),
                name: student.name.clone(),
                present,
                total,
                percent,
                below_threshold: percent < WARN_THRESHOLD_PERCENT,
            }
        })
        .collect();

    SectionSummary {
        section_id: section.id.clone(),
        section_name: section.name.clone(),
        total_classes: total,
        per_student,
    }
}
