//! Plain-text bodies for the transactional emails.

use chrono::NaiveDate;

use super::EmailMessage;

/// `12345, "usd"` -> `USD 123.45`
pub fn format_money(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{} {}{}.{:02}", currency.to_ascii_uppercase(), sign, abs / 100, abs % 100)
}

fn short_id(id: &uuid::Uuid) -> String { id.simple().to_string()[..8].to_ascii_uppercase() }

pub struct StayDetails<'a> {
    pub reservation_id: uuid::Uuid,
    pub venue_name: &'a str,
    pub service_name: &'a str,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total_cents: i64,
    pub currency: &'a str,
}

pub fn welcome(to: &str, name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome aboard".into(),
        text: format!("Hi {name},\n\nYour account is ready. You can now browse venues and book your next stay.\n"),
        html: None,
    }
}

pub fn reservation_confirmation(to: &str, name: &str, stay: &StayDetails<'_>) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Reservation {} confirmed", short_id(&stay.reservation_id)),
        text: format!(
            "Hi {name},\n\nYour reservation at {venue} is confirmed.\n\nService: {service}\nCheck-in: {cin}\nCheck-out: {cout}\nGuests: {guests}\nTotal: {total}\n",
            venue = stay.venue_name,
            service = stay.service_name,
            cin = stay.check_in,
            cout = stay.check_out,
            guests = stay.guests,
            total = format_money(stay.total_cents, stay.currency),
        ),
        html: None,
    }
}

pub fn reservation_cancelled(to: &str, name: &str, stay: &StayDetails<'_>, refund_cents: i64) -> EmailMessage {
    let refund = if refund_cents > 0 {
        format!("A refund of {} is on its way.\n", format_money(refund_cents, stay.currency))
    } else {
        "No refund applies to this cancellation.\n".to_string()
    };
    EmailMessage {
        to: to.to_string(),
        subject: format!("Reservation {} cancelled", short_id(&stay.reservation_id)),
        text: format!(
            "Hi {name},\n\nYour reservation at {} ({} to {}) has been cancelled.\n{refund}",
            stay.venue_name, stay.check_in, stay.check_out
        ),
        html: None,
    }
}

pub fn payment_receipt(to: &str, receipt_number: &str, amount_cents: i64, currency: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Payment receipt {receipt_number}"),
        text: format!(
            "Thank you for your payment.\n\nReceipt: {receipt_number}\nAmount: {}\n",
            format_money(amount_cents, currency)
        ),
        html: None,
    }
}

pub fn payment_failed(to: &str, amount_cents: i64, currency: &str, reason: Option<&str>) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Payment failed".into(),
        text: format!(
            "We could not process your payment of {}.\nReason: {}\n\nYou can retry from your reservations page.\n",
            format_money(amount_cents, currency),
            reason.unwrap_or("declined by the card issuer"),
        ),
        html: None,
    }
}

pub fn refund_processed(to: &str, amount_cents: i64, currency: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Refund processed".into(),
        text: format!(
            "A refund of {} has been issued. It can take 5-10 business days to appear on your statement.\n",
            format_money(amount_cents, currency)
        ),
        html: None,
    }
}
