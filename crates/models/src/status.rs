//! String-backed enums stored in `status`/`role`/`venue_type` columns.
//!
//! Columns stay plain strings in the schema; these types are the single place
//! where the allowed values and the lifecycle rules live.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name { $($variant),+ }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let up = s.trim().to_ascii_uppercase();
                match up.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ModelError::Validation(format!("invalid {}: {}", $label, s))),
                }
            }
        }
    };
}

string_enum!(
    /// Lifecycle of a reservation.
    ReservationStatus, "reservation status" {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        CheckedIn => "CHECKED_IN",
        CheckedOut => "CHECKED_OUT",
        Cancelled => "CANCELLED",
        NoShow => "NO_SHOW",
    }
);

impl ReservationStatus {
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (CheckedIn, CheckedOut)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReservationStatus::CheckedOut | ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }

    /// Whether a reservation in this state occupies a unit of inventory.
    pub fn holds_inventory(self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::NoShow)
    }

    pub fn cancellable(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

string_enum!(
    /// Lifecycle of a payment, mirrored 1:1 from gateway events.
    PaymentStatus, "payment status" {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
        Refunded => "REFUNDED",
        PartiallyRefunded => "PARTIALLY_REFUNDED",
    }
);

impl PaymentStatus {
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Failed, Processing)
                | (Failed, Completed)
                | (Completed, Refunded)
                | (Completed, PartiallyRefunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Cancelled | PaymentStatus::Refunded)
    }

    pub fn is_refundable(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::PartiallyRefunded)
    }

    /// Still waiting on the gateway; an intent can be reused.
    pub fn is_open(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing | PaymentStatus::Failed)
    }
}

string_enum!(
    VenueType, "venue type" {
        Hotel => "HOTEL",
        Restaurant => "RESTAURANT",
        Spa => "SPA",
        Tour => "TOUR",
        EventCenter => "EVENT_CENTER",
    }
);

string_enum!(
    /// How a service price scales with the booking.
    PricingUnit, "pricing unit" {
        PerNight => "PER_NIGHT",
        PerPerson => "PER_PERSON",
        PerBooking => "PER_BOOKING",
    }
);

string_enum!(
    RoleName, "role" {
        Admin => "ADMIN",
        VenueOwner => "VENUE_OWNER",
        Customer => "CUSTOMER",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_happy_path_transitions() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(CheckedIn));
        assert!(CheckedIn.can_transition_to(CheckedOut));
    }

    #[test]
    fn reservation_terminal_states_do_not_move() {
        use ReservationStatus::*;
        for from in [CheckedOut, Cancelled, NoShow] {
            assert!(from.is_terminal());
            for to in ReservationStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn reservation_cannot_skip_check_in() {
        assert!(!ReservationStatus::Confirmed.can_transition_to(ReservationStatus::CheckedOut));
        assert!(!ReservationStatus::Pending.can_transition_to(ReservationStatus::NoShow));
    }

    #[test]
    fn inventory_release() {
        assert!(ReservationStatus::Pending.holds_inventory());
        assert!(ReservationStatus::CheckedIn.holds_inventory());
        assert!(!ReservationStatus::Cancelled.holds_inventory());
        assert!(!ReservationStatus::NoShow.holds_inventory());
    }

    #[test]
    fn payment_lifecycle() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Refunded));
        assert!(!Refunded.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Completed));
    }

    #[test]
    fn failed_payment_can_be_retried_or_succeed_late() {
        use PaymentStatus::*;
        assert!(Failed.can_transition_to(Processing));
        assert!(Failed.can_transition_to(Completed));
        assert!(!Failed.can_transition_to(Refunded));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn parse_is_case_insensitive_and_round_trips_display() {
        assert_eq!("checked_in".parse::<ReservationStatus>().unwrap(), ReservationStatus::CheckedIn);
        assert_eq!(PaymentStatus::PartiallyRefunded.to_string(), "PARTIALLY_REFUNDED");
        assert!("bogus".parse::<VenueType>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let v = serde_json::to_value(ReservationStatus::NoShow).unwrap();
        assert_eq!(v, serde_json::json!("NO_SHOW"));
        let p: PricingUnit = serde_json::from_value(serde_json::json!("PER_PERSON")).unwrap();
        assert_eq!(p, PricingUnit::PerPerson);
    }
}
