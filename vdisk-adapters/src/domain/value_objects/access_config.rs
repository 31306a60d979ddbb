//! Access configuration value object.

/// When the adapter takes its misalignment lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPolicy {
    /// Lock only requests whose offset or length is not sector aligned.
    ///
    /// Aligned requests run without the lock. An aligned write racing a misaligned
    /// write on the same sector is therefore not excluded: the misaligned
    /// read-modify-write may put back the sector contents it read before the aligned
    /// write landed.
    #[default]
    Misaligned,
    /// Lock every request, aligned or not.
    ///
    /// Closes the aligned/misaligned gap at the cost of serializing all I/O through
    /// the adapter.
    Always,
}

/// Configuration for an aligned device.
///
/// # Examples
///
/// ```
/// use vdisk_adapters::domain::{AccessConfig, LockPolicy};
///
/// let config = AccessConfig::new().with_lock_policy(LockPolicy::Always);
/// assert_eq!(config.lock_policy(), LockPolicy::Always);
/// assert!(config.requires_lock(true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessConfig {
    lock_policy: LockPolicy,
}

impl AccessConfig {
    /// Default configuration: lock misaligned requests only.
    pub const fn new() -> Self {
        Self {
            lock_policy: LockPolicy::Misaligned,
        }
    }

    /// Replace the lock policy.
    pub const fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    /// The configured lock policy.
    #[inline]
    pub const fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }

    /// Whether a request with the given alignment must hold the misalignment lock.
    #[inline]
    pub const fn requires_lock(&self, aligned: bool) -> bool {
        match self.lock_policy {
            LockPolicy::Misaligned => !aligned,
            LockPolicy::Always => true,
        }
    }
}
