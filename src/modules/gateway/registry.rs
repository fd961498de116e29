//! Tracks how many downstream sessions are currently bound to each user id,
//! enforcing the configured per-user connection cap.

use std::collections::HashMap;
use std::sync::Mutex;

pub struct ConnectionRegistry {
    max_per_user: usize,
    counts: Mutex<HashMap<String, usize>>,
}

impl ConnectionRegistry {
    pub fn new(max_per_user: usize) -> Self {
        Self {
            max_per_user,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves a slot for `user_id`, returning `false` if the cap is already
    /// reached. The caller must call `release` when the session ends.
    pub fn try_acquire(&self, user_id: &str) -> bool {
        let mut counts = self.counts.lock().expect("registry lock poisoned");
        let count = counts.entry(user_id.to_string()).or_insert(0);
        if *count >= self.max_per_user {
            return false;
        }
        *count += 1;
        true
    }

    pub fn release(&self, user_id: &str) {
        let mut counts = self.counts.lock().expect("registry lock poisoned");
        if let Some(count) = counts.get_mut(user_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_the_cap_is_reached() {
        let registry = ConnectionRegistry::new(2);
        assert!(registry.try_acquire("u1"));
        assert!(registry.try_acquire("u1"));
        assert!(!registry.try_acquire("u1"));
    }

    #[test]
    fn release_frees_a_slot_for_reuse() {
        let registry = ConnectionRegistry::new(1);
        assert!(registry.try_acquire("u1"));
        assert!(!registry.try_acquire("u1"));
        registry.release("u1");
        assert!(registry.try_acquire("u1"));
    }

    #[test]
    fn tracks_users_independently() {
        let registry = ConnectionRegistry::new(1);
        assert!(registry.try_acquire("u1"));
        assert!(registry.try_acquire("u2"));
    }
}
