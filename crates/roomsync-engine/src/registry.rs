//! At-most-one registry of named long-running tasks.

use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinHandle;

/// Keeps at most one live task per name. Finished tasks are pruned on
/// the next spawn attempt, so a name becomes available again as soon
/// as its task ends.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` under `name` unless a task with that name is
    /// still running. Returns whether a task was spawned.
    pub fn spawn_once<F>(&mut self, name: &str, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|_, handle| !handle.is_finished());
        if self.tasks.contains_key(name) {
            return false;
        }
        self.tasks.insert(name.to_string(), tokio::spawn(future));
        true
    }

    /// Number of live tasks.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Abort every task, for shutdown.
    pub fn abort_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_spawn_with_the_same_name_is_refused() {
        let mut registry = TaskRegistry::new();
        assert!(registry.spawn_once("collection_1", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));
        assert!(!registry.spawn_once("collection_1", async {}));
        assert_eq!(registry.running(), 1);
        assert!(registry.spawn_once("subscription_1", async {}));
        registry.abort_all();
    }

    #[tokio::test]
    async fn finished_tasks_free_their_name() {
        let mut registry = TaskRegistry::new();
        assert!(registry.spawn_once("collection_1", async {}));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.spawn_once("collection_1", async {}));
        registry.abort_all();
    }
}
