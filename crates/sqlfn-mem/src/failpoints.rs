//! Allocation failpoints (feature: `failpoints`).
//!
//! Keep this extremely light: the macro expands to `false` unless the feature
//! is enabled. When enabled, points are armed per thread, so parallel tests
//! never observe each other's failures.

/// Managed storage allocation (`ManagedPtr::new_with`).
pub const MANAGED_ALLOC: &str = "managed_alloc";

/// Per-group aggregate storage (`aggregate_slot`).
pub const AGGREGATE_SLOT: &str = "aggregate_slot";

#[cfg(feature = "failpoints")]
mod armed {
    use std::cell::RefCell;

    thread_local! {
        static ARMED: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    pub fn arm(name: &'static str) {
        ARMED.with(|set| {
            let mut set = set.borrow_mut();
            if !set.contains(&name) {
                set.push(name);
            }
        });
    }

    pub fn disarm(name: &str) {
        ARMED.with(|set| set.borrow_mut().retain(|armed| *armed != name));
    }

    pub fn is_armed(name: &str) -> bool {
        ARMED.with(|set| set.borrow().iter().any(|armed| *armed == name))
    }
}

#[cfg(feature = "failpoints")]
pub use armed::{arm, disarm, is_armed};

/// Arms a point for the current thread until dropped.
#[cfg(feature = "failpoints")]
pub struct ArmedGuard {
    name: &'static str,
}

#[cfg(feature = "failpoints")]
pub fn scoped(name: &'static str) -> ArmedGuard {
    arm(name);
    ArmedGuard { name }
}

#[cfg(feature = "failpoints")]
impl Drop for ArmedGuard {
    fn drop(&mut self) {
        disarm(self.name);
    }
}

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {
        $crate::failpoints::is_armed($name)
    };
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($name:expr) => {{
        // no-op
        let _ = $name;
        false
    }};
}
