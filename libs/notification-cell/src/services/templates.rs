//! Patient-facing emails. Copy is in Spanish, as the clinic sends it.

use crate::models::{AppointmentNotice, EmailMessage};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

pub fn booking_confirmation(notice: &AppointmentNotice) -> EmailMessage {
    let name = notice.full_name();
    let date = notice.date.format(DATE_FORMAT);
    let start = notice.start_time.format(TIME_FORMAT);
    let end = notice.end_time.format(TIME_FORMAT);

    EmailMessage {
        to: notice.email.clone(),
        subject: "Nueva cita odontológica".to_string(),
        text: format!(
            "Hola {name},\n\nSe ha agendado una cita el día {date} de {start} a {end}.\n\nSi tienes dudas, contáctanos."
        ),
        html: Some(format!(
            "<p>Hola <b>{}</b>,<br><br>Se ha agendado una cita el día <b>{date}</b> de <b>{start}</b> a <b>{end}</b>.<br><br>Si tienes dudas, contáctanos.</p>",
            escape_html(&name)
        )),
    }
}

pub fn cancellation_notice(notice: &AppointmentNotice) -> EmailMessage {
    let name = notice.full_name();
    let date = notice.date.format(DATE_FORMAT);
    let start = notice.start_time.format(TIME_FORMAT);
    let end = notice.end_time.format(TIME_FORMAT);

    EmailMessage {
        to: notice.email.clone(),
        subject: "Cancelación de cita odontológica".to_string(),
        text: format!(
            "Hola {name},\n\nTu cita del día {date} de {start} a {end} ha sido cancelada por el administrador.\n\nSi tienes dudas, contáctanos."
        ),
        html: Some(format!(
            "<p>Hola <b>{}</b>,<br><br>Tu cita del día <b>{date}</b> de <b>{start}</b> a <b>{end}</b> ha sido cancelada por el administrador.<br><br>Si tienes dudas, contáctanos.</p>",
            escape_html(&name)
        )),
    }
}

pub fn appointment_reminder(notice: &AppointmentNotice) -> EmailMessage {
    let name = notice.full_name();
    let date = notice.date.format(DATE_FORMAT);
    let start = notice.start_time.format(TIME_FORMAT);

    EmailMessage {
        to: notice.email.clone(),
        subject: "Recordatorio de cita odontológica".to_string(),
        text: format!(
            "Hola {name},\n\nTe recordamos que tienes una cita el {date} a las {start}.\n\nPor favor, llega 10 minutos antes."
        ),
        html: Some(format!(
            "<p>Hola <b>{}</b>,<br><br>Te recordamos que tienes una cita el <b>{date}</b> a las <b>{start}</b>.<br><br>Por favor, llega 10 minutos antes.</p>",
            escape_html(&name)
        )),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
