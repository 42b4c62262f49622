pub mod alerts;
pub mod availability;
pub mod conflicts;
pub mod progress;
pub mod status;
