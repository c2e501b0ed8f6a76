pub mod session;
pub mod slot;

pub use session::{DialogState, Session, SessionData};
pub use slot::{SlotRow, SlotStatus};
