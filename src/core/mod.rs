pub mod models;
pub mod occupancy;

pub use models::{Job, JobState};
pub use occupancy::{Usage, occupancy};
