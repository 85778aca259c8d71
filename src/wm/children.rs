//! Processes launched from key bindings.
//!
//! Children are kept here until they exit and are reaped without blocking
//! whenever the window manager handles an event.

use std::collections::HashMap;
use std::process::{Child, Command};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct Children {
    inner: HashMap<u32, Child>,
}

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Run `command` through `sh -c` and keep the child until it exits
    pub fn spawn_shell(&mut self, command: &str) -> Result<u32> {
        info!("Launching: {}", command);
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .spawn()
            .with_context(|| format!("Failed to spawn {command:?}"))?;
        let pid = child.id();
        self.inner.insert(pid, child);
        Ok(pid)
    }

    /// Drop every child that has exited. A child whose status cannot be read
    /// is dropped too.
    pub fn reap(&mut self) {
        if self.is_empty() {
            return;
        }
        self.inner.retain(|pid, child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Child {} exited: {}", pid, status);
                false
            }
            Err(e) => {
                warn!("Failed to wait for child {}: {}", pid, e);
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn reap_until_empty(children: &mut Children) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !children.is_empty() && Instant::now() < deadline {
            children.reap();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_exited_child_is_reaped() {
        let mut children = Children::new();
        children.spawn_shell("exit 3").unwrap();
        assert_eq!(children.len(), 1);

        reap_until_empty(&mut children);
        assert!(children.is_empty());
    }

    #[test]
    fn test_running_child_is_kept() {
        let mut children = Children::new();
        let pid = children.spawn_shell("sleep 5").unwrap();
        children.reap();
        assert_eq!(children.len(), 1);

        if let Some(child) = children.inner.get_mut(&pid) {
            child.kill().unwrap();
        }
        reap_until_empty(&mut children);
        assert!(children.is_empty());
    }
}
