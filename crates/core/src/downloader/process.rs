//! Process-tree termination for the retrieval process.
//!
//! yt-dlp spawns helpers (ffmpeg for remuxing), so killing only the direct
//! child leaves orphans writing to the artifact. The whole tree is walked
//! through `sysinfo` and terminated leaves first.

use std::collections::{HashMap, VecDeque};

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::{debug, warn};

/// A snapshot of a process and all of its descendants.
pub struct ProcessTree {
    root: Pid,
    system: System,
}

impl ProcessTree {
    /// Captures the current process table.
    pub fn new(root_pid: u32) -> Self {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        Self {
            root: Pid::from_u32(root_pid),
            system,
        }
    }

    /// Whether the root process is still present in the snapshot.
    pub fn root_exists(&self) -> bool {
        self.system.process(self.root).is_some()
    }

    /// Pids of every descendant of the root, closest first.
    pub fn descendants(&self) -> Vec<u32> {
        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (pid, process) in self.system.processes() {
            if process.thread_kind().is_some() {
                continue;
            }
            if let Some(parent) = process.parent() {
                children.entry(parent).or_default().push(*pid);
            }
        }

        let mut result = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(pid) = queue.pop_front() {
            if let Some(kids) = children.get(&pid) {
                for kid in kids {
                    if *kid != self.root && !result.contains(&kid.as_u32()) {
                        result.push(kid.as_u32());
                        queue.push_back(*kid);
                    }
                }
            }
        }
        result
    }

    /// Sends SIGTERM to every descendant (deepest first), then to the root.
    ///
    /// Falls back to a hard kill where the signal is not supported.
    /// Returns the number of processes signalled.
    pub fn terminate(&self) -> usize {
        let mut targets: Vec<Pid> = self
            .descendants()
            .into_iter()
            .rev()
            .map(Pid::from_u32)
            .collect();
        targets.push(self.root);

        let mut signalled = 0;
        for pid in targets {
            let Some(process) = self.system.process(pid) else {
                continue;
            };
            let delivered = process
                .kill_with(Signal::Term)
                .unwrap_or_else(|| process.kill());
            if delivered {
                signalled += 1;
                debug!(pid = pid.as_u32(), "Signalled process");
            } else {
                warn!(pid = pid.as_u32(), "Failed to signal process");
            }
        }
        signalled
    }
}

/// Terminates the process tree rooted at `pid`. Safe to call on a pid that
/// already exited.
pub fn terminate_tree(pid: u32) -> usize {
    let tree = ProcessTree::new(pid);
    if !tree.root_exists() {
        debug!(pid, "Process already gone");
        return 0;
    }
    tree.terminate()
}
