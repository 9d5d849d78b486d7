//! Message text per booking event.
//!
//! Customers are Indonesian renters, so messages are written in Bahasa
//! Indonesia with `Rp` amounts and `dd Mon yyyy` dates.

use chrono::NaiveDate;

use rentix_core::{BookingEvent, ReservationStatus};

/// First 8 characters of a booking id, upper-cased, as shown to customers.
pub fn short_ref(booking_id: &str) -> String {
    booking_id.chars().take(8).collect::<String>().to_uppercase()
}

fn status_label(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Pending => "menunggu konfirmasi",
        ReservationStatus::Confirmed => "dikonfirmasi",
        ReservationStatus::Active => "sedang disewa",
        ReservationStatus::Completed => "selesai",
        ReservationStatus::Cancelled => "dibatalkan",
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Renders the WhatsApp message for `event`.
pub fn render(event: &BookingEvent, customer_name: &str) -> String {
    match event {
        BookingEvent::Created {
            booking_id,
            start_date,
            end_date,
            line_count,
            total,
            down_payment,
            remaining,
            ..
        } => format!(
            "Halo {name}, booking #{reference} sudah kami terima.\n\
             Periode: {start} - {end}\n\
             Jumlah item: {lines}\n\
             Total: {total}\n\
             DP: {dp}\n\
             Sisa pembayaran: {remaining}\n\
             Terima kasih!",
            name = customer_name,
            reference = short_ref(booking_id),
            start = fmt_date(*start_date),
            end = fmt_date(*end_date),
            lines = line_count,
            total = total,
            dp = down_payment,
            remaining = remaining,
        ),
        BookingEvent::StatusChanged {
            booking_id,
            reservation_id: Some(_),
            to,
            ..
        } => format!(
            "Halo {}, salah satu item pada booking #{} sekarang {}.",
            customer_name,
            short_ref(booking_id),
            status_label(*to)
        ),
        BookingEvent::StatusChanged {
            booking_id,
            reservation_id: None,
            to,
            ..
        } => format!(
            "Halo {}, status booking #{} sekarang {}.",
            customer_name,
            short_ref(booking_id),
            status_label(*to)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rentix_core::Money;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    #[test]
    fn test_created_message() {
        let event = BookingEvent::Created {
            booking_id: "3f2a9c1e-aaaa-bbbb-cccc-000000000000".into(),
            customer_id: "c-1".into(),
            start_date: d(10),
            end_date: d(12),
            line_count: 2,
            total: Money::from_minor(330_000),
            down_payment: Money::from_minor(165_000),
            remaining: Money::from_minor(165_000),
            occurred_at: Utc::now(),
        };

        let text = render(&event, "Budi");
        assert!(text.starts_with("Halo Budi, booking #3F2A9C1E"));
        assert!(text.contains("10 Aug 2026 - 12 Aug 2026"));
        assert!(text.contains("Total: Rp330.000"));
        assert!(text.contains("DP: Rp165.000"));
    }

    #[test]
    fn test_status_messages() {
        let booking_level = BookingEvent::StatusChanged {
            booking_id: "abcdef12-0000".into(),
            customer_id: "c-1".into(),
            reservation_id: None,
            from: ReservationStatus::Pending,
            to: ReservationStatus::Cancelled,
            occurred_at: Utc::now(),
        };
        assert_eq!(
            render(&booking_level, "Sari"),
            "Halo Sari, status booking #ABCDEF12 sekarang dibatalkan."
        );

        let line_level = BookingEvent::StatusChanged {
            booking_id: "abcdef12-0000".into(),
            customer_id: "c-1".into(),
            reservation_id: Some("r-1".into()),
            from: ReservationStatus::Confirmed,
            to: ReservationStatus::Active,
            occurred_at: Utc::now(),
        };
        assert!(render(&line_level, "Sari").contains("salah satu item"));
        assert!(render(&line_level, "Sari").ends_with("sedang disewa."));
    }

    #[test]
    fn test_short_ref_handles_short_ids() {
        assert_eq!(short_ref("ab"), "AB");
    }
}
