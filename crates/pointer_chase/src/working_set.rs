// The array of 64-bit slots that the latency probe chases through.

use std::hint::black_box;

use rand::Rng;

use crate::ProbeError;

/// Size in bytes of a single slot.
pub const SLOT_BYTES: usize = std::mem::size_of::<u64>();

/// A block of `u64` slots where each slot holds the index of the next
/// slot to visit.
///
/// Built by [`WorkingSet::try_new_cyclic`], the slots form one cycle
/// through every index, so `next = slots[next]` never leaves the array
/// and never settles into a smaller loop.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    slots: Vec<u64>,
}

/// What a pointer chase did: how many loads it issued, the sum of the
/// positions it visited and where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaseOutcome {
    pub steps: usize,
    pub checksum: u64,
    pub position: usize,
}

impl WorkingSet {
    /// Allocates `element_count` slots and fills them with a uniformly
    /// random single-cycle permutation of `0..element_count`.
    ///
    /// The cycle comes from Sattolo's variant of Fisher-Yates: the swap
    /// partner of slot `i` is drawn from `0..i` rather than `0..=i`. A
    /// plain shuffle may split the array into several disjoint cycles,
    /// and a chase starting at 0 would then only ever see one of them.
    ///
    /// __Arguments:__
    ///
    /// + `element_count` - number of slots, must be at least 1
    ///
    /// + `rng` - source of randomness for the shuffle
    ///
    pub fn try_new_cyclic<R: Rng + ?Sized>(
        element_count: usize,
        rng: &mut R,
    ) -> Result<Self, ProbeError> {
        assert!(element_count > 0, "a working set needs at least one slot");

        let mut slots = allocate_identity(element_count)?;

        for i in (1..element_count).rev() {
            let j = rng.gen_range(0..i);
            slots.swap(i, j);
        }

        Ok(Self { slots })
    }

    /// Wraps existing slot values without checking them.
    pub fn from_slots(slots: Vec<u64>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.slots.len() * SLOT_BYTES
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.slots
    }

    /// True when every value in `0..len` appears exactly once.
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.slots.len()];
        for &value in &self.slots {
            match seen.get_mut(value as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    /// Number of hops needed to get back to `start`, or `None` if the
    /// chain leaves the array or does not return within `len` hops.
    pub fn cycle_length(&self, start: usize) -> Option<usize> {
        let len = self.slots.len();
        if start >= len {
            return None;
        }

        let mut position = start;
        for hops in 1..=len {
            position = *self.slots.get(position)? as usize;
            if position >= len {
                return None;
            }
            if position == start {
                return Some(hops);
            }
        }
        None
    }

    /// Reads every slot once, in order, so that all pages are backed by
    /// physical memory before anything is timed.
    pub fn warm_up(&self) -> u64 {
        let sum = self
            .slots
            .iter()
            .fold(0u64, |acc, &value| acc.wrapping_add(value));
        black_box(sum)
    }

    /// Performs exactly `steps` dependent loads starting at `start`.
    ///
    /// Each load address is the value returned by the previous load, so
    /// neither the compiler nor the CPU can overlap them.
    pub fn chase(&self, start: usize, steps: usize) -> ChaseOutcome {
        assert!(start < self.slots.len(), "chase must start inside the working set");

        let slots = self.slots.as_slice();
        let mut position = start;
        let mut checksum = 0u64;
        let mut performed = 0usize;

        for _ in 0..steps {
            position = slots[position] as usize;
            checksum = checksum.wrapping_add(position as u64);
            performed += 1;
        }

        ChaseOutcome {
            steps: performed,
            checksum: black_box(checksum),
            position,
        }
    }
}

fn allocate_identity(element_count: usize) -> Result<Vec<u64>, ProbeError> {
    let allocation_error = || ProbeError::Allocation {
        element_count,
        bytes: element_count.saturating_mul(SLOT_BYTES),
    };

    // the largest sizes are meant to exceed every cache, but they must
    // still fit in memory or the measurement means nothing
    if element_count.checked_mul(SLOT_BYTES).is_none() {
        return Err(allocation_error());
    }

    let mut slots: Vec<u64> = Vec::new();
    slots
        .try_reserve_exact(element_count)
        .map_err(|_| allocation_error())?;
    slots.extend(0..element_count as u64);

    Ok(slots)
}
