pub mod bookings;
pub mod tours;
