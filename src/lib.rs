pub mod common;
pub mod configuration;
pub mod health;
pub mod proxy;
pub mod selection_method;
pub mod session;
pub mod utils;

pub mod prelude {
    pub use crate::common::error::{DispatchError, LoadBalancerError};
    pub use crate::common::types::BackendAddr;
    pub use crate::configuration::Settings;
    pub use crate::proxy::{LoadBalancer, Proxy};
}
