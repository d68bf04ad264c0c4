pub mod repo;

pub use repo::ActiveSession;

/// Concurrent session cap per user, enforced at admission time.
pub const MAX_ACTIVE_SESSIONS: usize = 5;
