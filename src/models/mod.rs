use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Roles ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Staff,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Member, Role::Staff, Role::Admin];
    pub const BACK_OFFICE: [Role; 2] = [Role::Staff, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Staff  => "staff",
            Role::Admin  => "admin",
        }
    }

    /// Display label shown in the navbar.
    pub fn label(self) -> &'static str {
        match self {
            Role::Member => "สมาชิก",
            Role::Staff  => "พนักงาน",
            Role::Admin  => "ผู้ดูแลระบบ",
        }
    }

    /// A role given by stored name or by display label.
    pub fn from_name_or_label(raw: &str) -> Option<Role> {
        let raw = raw.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == raw || role.label() == raw)
    }

    /// Lenient decode for stored values: anything unrecognised is a member.
    pub fn from_db(raw: &str) -> Role {
        Role::from_name_or_label(raw).unwrap_or(Role::Member)
    }

    pub fn is_back_office(self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl FromStr for Role {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "member" => Ok(Role::Member),
            "staff"  => Ok(Role::Staff),
            "admin"  => Ok(Role::Admin),
            other    => Err(UnknownValue(other.to_owned())),
        }
    }
}

// ── Booking status ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Unpaid,
    PendingVerification,
    Paid,
    PaymentFailed,
}

impl BookingStatus {
    /// Values staff may assign from the payment-verification screen.
    pub const VERIFICATION_CHOICES: [BookingStatus; 3] =
        [BookingStatus::Paid, BookingStatus::PaymentFailed, BookingStatus::Unpaid];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Unpaid              => "unpaid",
            BookingStatus::PendingVerification => "pending_verification",
            BookingStatus::Paid                => "paid",
            BookingStatus::PaymentFailed       => "payment_failed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BookingStatus::Unpaid              => "ยังไม่ชำระเงิน",
            BookingStatus::PendingVerification => "รอยืนยันการชำระเงิน",
            BookingStatus::Paid                => "ชำระเงินแล้ว",
            BookingStatus::PaymentFailed       => "ชำระเงินไม่สำเร็จ",
        }
    }

    /// Parse a status submitted by staff, by stored name or by label; `None`
    /// for anything off the allow-list.
    pub fn from_verification(raw: &str) -> Option<BookingStatus> {
        let raw = raw.trim();
        Self::VERIFICATION_CHOICES
            .into_iter()
            .find(|status| status.as_str() == raw || status.label() == raw)
    }

    /// A slip may be (re)uploaded until payment has been confirmed.
    pub fn accepts_slip(self) -> bool {
        !matches!(self, BookingStatus::Paid)
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unpaid"               => Ok(BookingStatus::Unpaid),
            "pending_verification" => Ok(BookingStatus::PendingVerification),
            "paid"                 => Ok(BookingStatus::Paid),
            "payment_failed"       => Ok(BookingStatus::PaymentFailed),
            other                  => Err(UnknownValue(other.to_owned())),
        }
    }
}

// ── Check-in status ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckinStatus {
    Awaiting,
    CheckedIn,
}

impl CheckinStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckinStatus::Awaiting  => "awaiting",
            CheckinStatus::CheckedIn => "checked_in",
        }
    }
}

// ── Tours ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tour {
    pub tour_id:      u64,
    pub tour_name:    String,
    pub price:        u32,
    pub description:  String,
    pub country:      String,
    pub start_date:   NaiveDate,
    pub end_date:     NaiveDate,
    pub seat:         u32,
    pub seats_booked: u32,
    pub image:        Option<String>,
    pub guide_id:     Option<u64>,
}

// ── Guides ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Guide {
    pub guide_id:   u64,
    pub first_name: String,
    pub last_name:  String,
    pub email:      String,
    pub phone:      String,
    pub gender:     String,
}

// ── Users ────────────────────────────────────────────────────

/// A user as shown to staff and on booking forms. The password hash never
/// leaves the auth routes.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id:    u64,
    pub first_name: String,
    pub last_name:  String,
    pub phone:      String,
    pub dob:        Option<NaiveDate>,
    pub gender:     Option<String>,
    pub email:      String,
    pub role:       String,
}

pub const USER_PROFILE_COLUMNS: &str =
    "user_id, first_name, last_name, phone, dob, gender, email, role";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_their_stored_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(Role::from_db("superuser"), Role::Member);
        assert_eq!(Role::from_db("พนักงาน"), Role::Staff);
    }

    #[test]
    fn only_staff_and_admin_are_back_office() {
        assert!(!Role::Member.is_back_office());
        assert!(Role::Staff.is_back_office());
        assert!(Role::Admin.is_back_office());
    }

    #[test]
    fn verification_accepts_only_the_allow_list() {
        assert_eq!(BookingStatus::from_verification("paid"), Some(BookingStatus::Paid));
        assert_eq!(
            BookingStatus::from_verification("payment_failed"),
            Some(BookingStatus::PaymentFailed)
        );
        assert_eq!(BookingStatus::from_verification("unpaid"), Some(BookingStatus::Unpaid));
        assert_eq!(BookingStatus::from_verification("pending_verification"), None);
        assert_eq!(BookingStatus::from_verification("refunded"), None);
        assert_eq!(BookingStatus::from_verification(""), None);
        assert_eq!(
            BookingStatus::from_verification("ชำระเงินแล้ว"),
            Some(BookingStatus::Paid)
        );
        assert_eq!(BookingStatus::from_verification("รอยืนยันการชำระเงิน"), None);
    }

    #[test]
    fn paid_bookings_no_longer_take_slips() {
        assert!(BookingStatus::Unpaid.accepts_slip());
        assert!(BookingStatus::PaymentFailed.accepts_slip());
        assert!(BookingStatus::PendingVerification.accepts_slip());
        assert!(!BookingStatus::Paid.accepts_slip());
    }
}
