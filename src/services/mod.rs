pub mod availability;
pub mod conversation;
pub mod dialog;
pub mod info;
pub mod messaging;
pub mod reservation;
pub mod slots;
