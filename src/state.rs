use crate::metadata::ResolvedTimestamp;
use crate::naming::{self, DestinationPlan, DEFAULT_FOLDER_NAME};
use anyhow::Result;
use std::collections::HashSet;

/// Mutable state of one batch: the folder name so far and the next sequence
/// number. Owned by the coordinator; copy workers never see it.
#[derive(Debug)]
pub struct BatchState {
    folder_name: String,
    next_sequence: u64,
    timestamped: usize,
    assigned: HashSet<String>,
}

impl BatchState {
    pub fn new() -> Self {
        Self {
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            next_sequence: 1,
            timestamped: 0,
            assigned: HashSet::new(),
        }
    }

    /// Plan the destination of the next file in traversal order.
    ///
    /// Only timestamped files consume a sequence number, and each one
    /// overwrites the folder name: the last timestamped file wins.
    ///
    /// Destination names are unique within the batch. A synthesized name that
    /// is already taken moves on to the next free sequence number; a
    /// pass-through name that is already taken is an error.
    pub fn assign(
        &mut self,
        original_name: &str,
        ext: &str,
        ts: Option<&ResolvedTimestamp>,
    ) -> Result<DestinationPlan> {
        let mut plan = naming::plan_destination(original_name, ext, ts, self.next_sequence);
        if ts.is_some() {
            while self.assigned.contains(&plan.file_name) {
                self.next_sequence += 1;
                plan = naming::plan_destination(original_name, ext, ts, self.next_sequence);
            }
        } else if self.assigned.contains(&plan.file_name) {
            anyhow::bail!("Destination name {} is already taken in this batch", plan.file_name);
        }

        self.assigned.insert(plan.file_name.clone());
        if let Some(folder) = &plan.folder_name {
            self.folder_name = folder.clone();
            self.next_sequence += 1;
            self.timestamped += 1;
        }
        Ok(plan)
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn timestamped(&self) -> usize {
        self.timestamped
    }

    pub fn into_folder_name(self) -> String {
        self.folder_name
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}
