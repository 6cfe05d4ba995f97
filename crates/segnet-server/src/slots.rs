//! Client slot table.
//!
//! Connections occupy the lowest free slot and are serviced in slot index
//! order each poll round. Slots are reused after a client drops, so each
//! occupant also carries a monotonic connection id that never repeats;
//! response routing keys on that id, not the slot.

use segnet_transport::Handle;

/// Default client capacity of a command server.
pub const DEFAULT_MAX_CLIENTS: usize = 492;

/// One connected client.
#[derive(Debug, Clone, Copy)]
pub struct ClientSlot {
    pub handle: Handle,
    pub conn_id: u64,
}

/// Fixed-capacity table of connected clients.
#[derive(Debug)]
pub struct SlotTable {
    slots: Vec<Option<ClientSlot>>,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Claim the lowest free slot, or `None` when the table is full.
    pub fn occupy(&mut self, handle: Handle, conn_id: u64) -> Option<usize> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(ClientSlot { handle, conn_id });
        Some(idx)
    }

    pub fn free(&mut self, idx: usize) -> Option<ClientSlot> {
        self.slots.get_mut(idx).and_then(Option::take)
    }

    pub fn get(&self, idx: usize) -> Option<ClientSlot> {
        self.slots.get(idx).copied().flatten()
    }

    /// Occupied slots in index order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, ClientSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|c| (i, c)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}
