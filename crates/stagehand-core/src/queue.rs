use stagehand_schema::{Handle, ResourceDefinition};

/// A declared definition together with its lifecycle sequence number.
#[derive(Debug, Clone)]
pub struct QueuedResource {
    pub seq: u64,
    pub definition: ResourceDefinition,
}

/// Declared resources not yet bound to a trigger, in declaration order.
#[derive(Debug, Default)]
pub struct ResourceQueue {
    entries: Vec<QueuedResource>,
}

impl ResourceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, seq: u64, definition: ResourceDefinition) {
        self.entries.push(QueuedResource { seq, definition });
    }

    /// First queued entry with `handle`. Duplicate handles are allowed; the
    /// earliest declaration wins.
    pub fn find_mut(&mut self, handle: &str) -> Option<&mut QueuedResource> {
        self.entries
            .iter_mut()
            .find(|e| e.definition.handle == handle)
    }

    /// Remove and return every entry, leaving the queue empty.
    pub fn take_all(&mut self) -> Vec<QueuedResource> {
        std::mem::take(&mut self.entries)
    }

    /// Put entries back at the front, ahead of anything queued meanwhile.
    pub fn restore(&mut self, mut entries: Vec<QueuedResource>) {
        entries.append(&mut self.entries);
        self.entries = entries;
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedResource> {
        self.entries.iter()
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.entries
            .iter()
            .map(|e| e.definition.handle.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
