pub mod prober;

pub use prober::{HealthCheckSettings, HealthProber};
