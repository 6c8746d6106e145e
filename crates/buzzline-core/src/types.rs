use std::fmt;
use uuid::Uuid;

/// Identity of one open event stream (UUIDv7, time-sortable for easier log correlation).
/// Only used for registry membership and logging; never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}
