//! Queue configuration

use crate::config::{DEFAULT_MAX_CAPACITY, DEFAULT_QUEUE_NAME};

/// Configuration for a [`MessageQueue`](super::MessageQueue)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Name used in log output
    pub name: String,
    /// Capacity allocated at construction; 0 means no storage until resized
    pub initial_capacity: u32,
    /// Largest capacity a resize may allocate
    pub max_capacity: u32,
    /// Whether a resize wakes every parked caller so it rechecks against the
    /// new capacity
    pub wake_on_resize: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            initial_capacity: 0,
            max_capacity: DEFAULT_MAX_CAPACITY,
            wake_on_resize: true,
        }
    }
}

impl QueueConfig {
    /// Create a new configuration with custom name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the capacity allocated at construction
    pub fn with_initial_capacity(mut self, capacity: u32) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the resize ceiling
    pub fn with_max_capacity(mut self, capacity: u32) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Set the resize wakeup policy
    pub fn with_wake_on_resize(mut self, wake: bool) -> Self {
        self.wake_on_resize = wake;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::QueueError;

        if self.name.is_empty() {
            return Err(QueueError::invalid_parameter(
                "name",
                "Queue name cannot be empty",
            ));
        }

        if self.initial_capacity > self.max_capacity {
            return Err(QueueError::invalid_parameter(
                "initial_capacity",
                format!(
                    "Initial capacity {} exceeds max capacity {}",
                    self.initial_capacity, self.max_capacity
                ),
            ));
        }

        Ok(())
    }
}
