//! Entity models with their query functions.

mod asset;
mod booking_group;
mod booking_occurrence;
mod configuration;
mod room_booking;

pub use asset::Asset;
pub use booking_group::BookingGroupRow;
pub use booking_occurrence::BookingOccurrenceRow;
pub use configuration::ConfigurationRow;
pub use room_booking::RoomBookingRow;
