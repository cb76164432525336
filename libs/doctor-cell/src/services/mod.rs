pub mod slots;
pub mod resolver;
pub mod editor;

pub use slots::{GeneratedSlots, SlotGenerator};
pub use resolver::AvailabilityResolver;
pub use editor::ScheduleEditor;
