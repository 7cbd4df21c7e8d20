use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub address_id: Option<Uuid>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: BookingStatus,
    pub service_price: Decimal,
    pub addons_price: Decimal,
    pub subtotal: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub provider_earnings: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub provider_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a booking.
///
/// ```text
/// pending ──► accepted ──► in_progress ──► completed
///    │  │         │              │
///    │  └─────────┴──────────────┴──► cancelled
///    └──► rejected
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Rejected,
    ];

    pub fn allowed_transitions(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Pending => &[Accepted, Rejected, Cancelled],
            Accepted => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled | Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether a booking in this status still holds its time slot.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "accepted" => Some(BookingStatus::Accepted),
            "in_progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "rejected" => Some(BookingStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "online" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

/// Snapshot of an addon as it was priced when the booking was made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingAddonLine {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub addon_id: Uuid,
    pub addon_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusChange {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub from_status: Option<BookingStatus>,
    pub to_status: BookingStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub addons: Vec<BookingAddonLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddonSelection {
    pub addon_id: Uuid,
    pub quantity: Option<i32>,
}

impl AddonSelection {
    /// Missing quantities count as one; anything lower is raised to one.
    pub fn effective_quantity(&self) -> i32 {
        self.quantity.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub address_id: Option<Uuid>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// `Paid` only when the booking comes out of an already settled payment flow.
    #[serde(default = "default_payment_status")]
    pub payment_status: PaymentStatus,
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Pending
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransitionOptions {
    pub cancellation_reason: Option<String>,
    pub provider_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 6] = BookingStatus::ALL;

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [Completed, Cancelled, Rejected] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
            }
        }
    }

    #[test]
    fn completion_is_only_reachable_from_in_progress() {
        for from in ALL {
            assert_eq!(from.can_transition_to(Completed), from == InProgress);
        }
    }

    #[test]
    fn transition_table() {
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(InProgress));

        assert!(Accepted.can_transition_to(InProgress));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(!Accepted.can_transition_to(Rejected));

        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Accepted));
    }

    #[test]
    fn status_strings_match_storage_format() {
        for status in ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(
            serde_json::to_string(&InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn only_live_bookings_occupy_slots() {
        assert!(Pending.occupies_slot());
        assert!(Completed.occupies_slot());
        assert!(!Cancelled.occupies_slot());
        assert!(!Rejected.occupies_slot());
    }

    #[test]
    fn addon_quantity_defaults_and_floors_at_one() {
        let id = Uuid::new_v4();
        assert_eq!(AddonSelection { addon_id: id, quantity: None }.effective_quantity(), 1);
        assert_eq!(AddonSelection { addon_id: id, quantity: Some(0) }.effective_quantity(), 1);
        assert_eq!(AddonSelection { addon_id: id, quantity: Some(-4) }.effective_quantity(), 1);
        assert_eq!(AddonSelection { addon_id: id, quantity: Some(3) }.effective_quantity(), 3);
    }
}
