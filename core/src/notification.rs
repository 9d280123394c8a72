//! Confirmation and cancellation email templates.

use crate::appointment::Appointment;
use crate::providers::EmailMessage;
use chrono::{FixedOffset, Offset, Utc};

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Static values shared by all email templates.
#[derive(Clone, Debug)]
pub struct EmailTemplates {
    /// Sender display name, also used as the clinic name in the body
    pub clinic_name: String,
    /// Contact phone shown in the footer
    pub contact_phone: String,
    /// Contact email shown in the footer
    pub contact_email: String,
    /// Currency code printed next to amounts
    pub currency: String,
    /// Offset used when rendering dates and times
    pub display_offset: FixedOffset,
}

impl Default for EmailTemplates {
    fn default() -> Self {
        Self {
            clinic_name: "Imaging Centre".to_string(),
            contact_phone: "+00 0000 000000".to_string(),
            contact_email: "contact@example.com".to_string(),
            currency: "INR".to_string(),
            display_offset: Utc.fix(),
        }
    }
}

impl EmailTemplates {
    /// Appointment date, e.g. `Monday, March 3, 2025`.
    #[must_use]
    pub fn format_date(&self, appointment: &Appointment) -> String {
        appointment
            .appointment_date
            .with_timezone(&self.display_offset)
            .format("%A, %B %-d, %Y")
            .to_string()
    }

    /// Appointment time, e.g. `9:30 AM`.
    #[must_use]
    pub fn format_time(&self, appointment: &Appointment) -> String {
        appointment
            .appointment_date
            .with_timezone(&self.display_offset)
            .format("%-I:%M %p")
            .to_string()
    }

    /// Sent after a verified payment.
    #[must_use]
    pub fn confirmation(&self, appointment: &Appointment) -> EmailMessage {
        let payment_id = appointment.payment_id.as_deref().unwrap_or("-");
        let rows = [
            ("Test", appointment.test_type.display_name().to_string()),
            ("Date", self.format_date(appointment)),
            ("Time", self.format_time(appointment)),
            ("Amount paid", format!("{} {}", self.currency, appointment.amount)),
            ("Payment ID", payment_id.to_string()),
        ];
        EmailMessage {
            to: appointment.email.clone(),
            subject: format!("Appointment confirmed: {}", appointment.test_type.display_name()),
            html_body: self.render(
                &appointment.name,
                "Your appointment is confirmed",
                "We have received your payment. Please arrive 15 minutes before your scheduled time.",
                &rows,
            ),
        }
    }

    /// Sent after a cancellation.
    #[must_use]
    pub fn cancellation(&self, appointment: &Appointment) -> EmailMessage {
        let rows = [
            ("Test", appointment.test_type.display_name().to_string()),
            ("Date", self.format_date(appointment)),
            ("Time", self.format_time(appointment)),
        ];
        EmailMessage {
            to: appointment.email.clone(),
            subject: format!("Appointment cancelled: {}", appointment.test_type.display_name()),
            html_body: self.render(
                &appointment.name,
                "Your appointment has been cancelled",
                "If you did not request this, or would like to book a new slot, please contact us.",
                &rows,
            ),
        }
    }

    fn render(&self, name: &str, heading: &str, lead: &str, rows: &[(&str, String)]) -> String {
        let table: String = rows
            .iter()
            .map(|(label, value)| {
                format!(
                    "<tr><td style=\"padding:4px 12px 4px 0\"><strong>{}</strong></td><td>{}</td></tr>",
                    escape_html(label),
                    escape_html(value)
                )
            })
            .collect();

        format!(
            "<html><body style=\"font-family:sans-serif\">\
             <h2>{heading}</h2>\
             <p>Dear {name},</p>\
             <p>{lead}</p>\
             <table>{table}</table>\
             <p>Questions? Call {phone} or write to {email}.</p>\
             <p>{clinic}</p>\
             </body></html>",
            heading = escape_html(heading),
            name = escape_html(name),
            lead = escape_html(lead),
            phone = escape_html(&self.contact_phone),
            email = escape_html(&self.contact_email),
            clinic = escape_html(&self.clinic_name),
        )
    }
}
