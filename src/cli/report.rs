use crate::core::similarity::FaceComparison;
use crate::service::protocol::{AttendanceSheet, PhotoFormView, SessionView, StudentView};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn status(active: bool) -> &'static str {
    if active { "ACTIVE" } else { "inactive" }
}

pub fn format_session(session: &SessionView) -> String {
    format!(
        "{}  {} {}-{}  [{}]",
        session.id, session.date, session.start, session.end, status(session.active)
    )
}

pub fn format_sessions(sessions: &[SessionView]) -> String {
    if sessions.is_empty() {
        return "No sessions yet.\n".to_string();
    }

    let mut content = format!("{} session(s):\n", sessions.len());
    for session in sessions {
        content.push_str("  ");
        content.push_str(&format_session(session));
        content.push('\n');
    }
    content
}

pub fn format_students(students: &[StudentView]) -> String {
    if students.is_empty() {
        return "No students registered.\n".to_string();
    }

    let name_width = students
        .iter()
        .map(|s| s.last_name.len() + s.first_name.len() + 2)
        .max()
        .unwrap_or(0);

    let mut content = String::new();
    for student in students {
        let name = format!("{}, {}", student.last_name, student.first_name);
        content.push_str(&format!(
            "{:<10}  {:<width$}  {}{}\n",
            student.registration,
            name,
            student.id,
            if student.has_reference_photo { "" } else { "  (no photo)" },
            width = name_width
        ));
    }
    content
}

pub fn format_photo_form(form: &PhotoFormView) -> String {
    let mut content = format!("Student: {}\n", form.student_name);
    content.push_str(&format!("Session: {}\n", format_session(&form.session)));
    if !form.has_reference_photo {
        content.push_str("No reference photo registered; check-in will be refused.\n");
    }
    if form.active {
        content.push_str("Ready for capture.\n");
    } else {
        content.push_str("The session is not active; check-in is closed.\n");
    }
    content
}

pub fn format_attendance(sheet: &AttendanceSheet) -> String {
    let mut content = format!("Attendance for {}\n", format_session(&sheet.session));

    if sheet.entries.is_empty() {
        content.push_str("No check-ins recorded.\n");
        return content;
    }

    for entry in &sheet.entries {
        content.push_str(&format!(
            "  {}  {:<30} {:<10} {:>6.1}%\n",
            entry.recorded_at.format(TIME_FORMAT),
            entry.student_name,
            entry.registration.as_deref().unwrap_or("-"),
            entry.similarity_percent
        ));
    }
    content.push_str(&format!("Total: {}\n", sheet.entries.len()));
    content
}

pub fn format_comparison(comparison: &FaceComparison, threshold: f64) -> String {
    format!(
        "Similarity: {:.1}% (threshold {:.1}%) -> {}\n",
        comparison.score * 100.0,
        threshold * 100.0,
        if comparison.is_match { "MATCH" } else { "NO MATCH" }
    )
}
