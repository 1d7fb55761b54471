pub mod adapter;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod health;
pub mod metrics;
pub mod policy;
pub mod ratelimit;
pub mod registry;
pub mod router;
pub mod schema;

pub use descriptor::{AdapterKind, RateLimits, ServiceDescriptor, ServiceDescriptorSpec};
pub use error::RouterError;
pub use health::{HealthSnapshot, HealthState};
pub use registry::ServiceRegistry;
pub use router::ServiceRouter;
