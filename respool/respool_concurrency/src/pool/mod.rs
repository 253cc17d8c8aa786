//! Resource pooling and reuse of expensive resources.
//!
//! - [`Resource`]: a unit that is costly to set up and cheap to reuse
//! - [`ResourcePool`]: creates resources up to a cap and recycles them
//! - [`ResourceHandle`]: scoped checkout that returns its resource on drop

pub mod resource;
pub mod resource_pool;

pub use resource::{Resource, ResourceHandle};
pub use resource_pool::{PoolStats, ResourcePool};
