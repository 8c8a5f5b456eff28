pub mod appointments;
pub mod calendar;
pub mod clock;
pub mod projection;
pub mod refresh;
pub mod storage;
