pub mod backend;
pub mod dispatcher;
pub mod load_balancer;
#[allow(clippy::module_inception)]
pub mod proxy;

pub use load_balancer::LoadBalancer;
pub use proxy::Proxy;
