pub mod stats_cache;
pub mod velocity_stat;

pub use stats_cache::{VelocityCache, VelocityRow, VELOCITY_SCHEMA};
pub use velocity_stat::{CourseContext, StatWindow, VelocityKey, VelocityStat};

/// Read-only source of velocity statistics
///
/// `None` is an explicit "not found"; implementations must never fabricate a
/// zero record for an unknown entity.
pub trait VelocityStore: Send + Sync {
    fn lookup(&self, key: &VelocityKey, window: StatWindow) -> Option<VelocityStat>;

    /// Length in days of the `Recent` window this store serves, when fixed
    fn recent_window_days(&self) -> Option<u32> {
        None
    }
}
