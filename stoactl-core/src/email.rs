//! Covenant reminder email templates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Everything a reminder needs to say about one covenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantReminder {
    pub covenant_id: i32,
    pub to: String,
    pub project_name: String,
    pub lender_name: Option<String>,
    pub loan_id: Option<i32>,
    pub covenant_type: String,
    pub requirement: Option<String>,
    pub compliance_date: NaiveDate,
    pub days_remaining: i64,
}

/// Rendered message, transport-agnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl EmailMessage {
    /// RFC 5322-ish rendering with a multipart/alternative body, for outbox files.
    pub fn to_eml(&self, boundary: &str) -> String {
        format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nMIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"{b}\"\r\n\r\n\
             --{b}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{text}\r\n\
             --{b}\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{html}\r\n\
             --{b}--\r\n",
            from = self.from,
            to = self.to,
            subject = self.subject,
            b = boundary,
            text = self.text_body,
            html = self.html_body,
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn due_phrase(days: i64) -> String {
    match days {
        0 => "today".to_owned(),
        1 => "in 1 day".to_owned(),
        n => format!("in {} days", n),
    }
}

/// Render a covenant reminder.
pub fn render_covenant_reminder(from: &str, reminder: &CovenantReminder) -> EmailMessage {
    let date = reminder.compliance_date.format("%m/%d/%Y").to_string();
    let subject = format!(
        "Covenant reminder: {} – {} due {}",
        reminder.project_name, reminder.covenant_type, date
    );

    let mut lines: Vec<(&str, String)> = vec![
        ("Project", reminder.project_name.clone()),
        ("Covenant", reminder.covenant_type.clone()),
    ];
    if let Some(lender) = &reminder.lender_name {
        lines.push(("Lender", lender.clone()));
    }
    if let Some(loan_id) = reminder.loan_id {
        lines.push(("Loan", format!("#{}", loan_id)));
    }
    if let Some(req) = &reminder.requirement {
        lines.push(("Requirement", req.clone()));
    }
    lines.push(("Compliance date", date.clone()));

    let due = due_phrase(reminder.days_remaining);

    let mut text_body = format!(
        "The following covenant is due {}.\n\n",
        due
    );
    for (label, value) in &lines {
        text_body.push_str(&format!("{}: {}\n", label, value));
    }
    text_body.push_str("\nMark the covenant complete in the banking dashboard once satisfied.\n");

    let mut html_body = format!(
        "<p>The following covenant is due <strong>{}</strong>.</p>\n<table>\n",
        escape_html(&due)
    );
    for (label, value) in &lines {
        html_body.push_str(&format!(
            "  <tr><th align=\"left\">{}</th><td>{}</td></tr>\n",
            escape_html(label),
            escape_html(value)
        ));
    }
    html_body.push_str("</table>\n<p>Mark the covenant complete in the banking dashboard once satisfied.</p>\n");

    EmailMessage {
        from: from.to_owned(),
        to: reminder.to.clone(),
        subject,
        text_body,
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> CovenantReminder {
        CovenantReminder {
            covenant_id: 9,
            to: "banking@example.com".into(),
            project_name: "The <Heights>".into(),
            lender_name: Some("First Bank".into()),
            loan_id: Some(12),
            covenant_type: "DSCR".into(),
            requirement: Some("1.25x".into()),
            compliance_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            days_remaining: 14,
        }
    }

    #[test]
    fn subject_names_project_type_and_date() {
        let msg = render_covenant_reminder("noreply@example.com", &reminder());
        assert_eq!(msg.subject, "Covenant reminder: The <Heights> – DSCR due 09/30/2024");
        assert_eq!(msg.to, "banking@example.com");
    }

    #[test]
    fn html_escapes_values() {
        let msg = render_covenant_reminder("noreply@example.com", &reminder());
        assert!(msg.html_body.contains("The &lt;Heights&gt;"));
        assert!(!msg.html_body.contains("<Heights>"));
        assert!(msg.text_body.contains("Project: The <Heights>"));
    }

    #[test]
    fn body_lists_details() {
        let msg = render_covenant_reminder("noreply@example.com", &reminder());
        assert!(msg.text_body.contains("due in 14 days"));
        assert!(msg.text_body.contains("Lender: First Bank"));
        assert!(msg.text_body.contains("Loan: #12"));
        assert!(msg.text_body.contains("Requirement: 1.25x"));
    }

    #[test]
    fn due_today_phrase() {
        let mut r = reminder();
        r.days_remaining = 0;
        let msg = render_covenant_reminder("noreply@example.com", &r);
        assert!(msg.text_body.contains("due today"));
    }

    #[test]
    fn eml_has_both_parts() {
        let msg = render_covenant_reminder("noreply@example.com", &reminder());
        let eml = msg.to_eml("b1");
        assert!(eml.starts_with("From: noreply@example.com\r\n"));
        assert!(eml.contains("text/plain"));
        assert!(eml.contains("text/html"));
        assert!(eml.ends_with("--b1--\r\n"));
    }
}
