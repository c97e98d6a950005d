//! Single-cycle permutation builder.
//!
//! The random access pattern chases `next` indices around one cycle that covers every
//! entry of the arena. This module builds that cycle in place:
//! 1. **Ring:** [`link_ring`] writes the trivial cycle `i -> i + 1 mod N`.
//! 2. **Shuffle:** [`shuffle`] runs a Fisher-Yates pass over array positions. Each step
//!    ([`swap_entries`]) exchanges two entries' places in the cycle and repairs the
//!    surrounding links, so the arrangement stays a single N-cycle after every step.
//! 3. **Verification:** [`check_single_cycle`] walks the arrangement and reports the
//!    first violation it finds.
//!
//! Since a swap only relabels the cycle, applying a uniform random relabelling to the
//! ring yields a uniformly random cyclic order.

use rand::Rng;
use tracing::debug;

use crate::arena::EntryArena;
use crate::common::{Result, ThrashError};

/// Links the arena as the sequential ring `i -> i + 1 mod N`.
///
/// # Errors
///
/// Returns [`ThrashError::TooFewEntries`] if the arena has fewer than two entries.
pub fn link_ring(arena: &mut EntryArena) -> Result<()> {
    let n = arena.len();
    if n < 2 {
        return Err(ThrashError::TooFewEntries { entries: n });
    }
    for i in 0..n {
        let entry = &mut arena[i];
        entry.prev = (i + n - 1) % n;
        entry.next = (i + 1) % n;
    }
    Ok(())
}

/// Exchanges the places of entries `i` and `choice` in the cycle.
///
/// The payloads of the two slots are swapped, then the up to four neighbours that
/// referred to one of them are retargeted at the other. When the node before `i` is
/// also the node after `choice` (or the other way round), that neighbour has both of
/// its links retargeted, which amounts to toggling them. A neighbour that is `i` or
/// `choice` itself is skipped; the swapped payload then points at its own slot, and
/// that self-loop is redirected to the other position. This is exactly the case where
/// `i` and `choice` were adjacent in the cycle.
///
/// `choice == i` leaves the arena untouched. Both indices must be in bounds and the
/// arena must already be a doubly linked single cycle.
pub fn swap_entries(arena: &mut EntryArena, i: usize, choice: usize) {
    if i == choice {
        return;
    }

    let (a, b) = (arena[i], arena[choice]);
    arena.swap(i, choice);

    // Neighbours outside the pair point at the old slot; send them to the new one.
    if a.prev != choice {
        arena[a.prev].next = choice;
    }
    if a.next != choice {
        arena[a.next].prev = choice;
    }
    if b.prev != i {
        arena[b.prev].next = i;
    }
    if b.next != i {
        arena[b.next].prev = i;
    }

    // Adjacent pair: the swapped payloads now refer to their own slots.
    repair_self_loop(arena, i, choice);
    repair_self_loop(arena, choice, i);
}

fn repair_self_loop(arena: &mut EntryArena, at: usize, other: usize) {
    let entry = &mut arena[at];
    if entry.next == at {
        entry.next = other;
    }
    if entry.prev == at {
        entry.prev = other;
    }
}

/// Shuffles a linked ring, drawing each swap partner from `choose`.
///
/// For every position `i` in `0..N-1`, `choose(i)` must return a value in `[i, N-1]`.
/// Exposed so tests and tools can replay a fixed choice sequence.
///
/// # Errors
///
/// Returns [`ThrashError::TooFewEntries`] for arenas smaller than two entries and
/// [`ThrashError::ChoiceOutOfRange`] if `choose` leaves the permitted range. In the
/// latter case the arena still holds a single cycle.
pub fn shuffle_with<F>(arena: &mut EntryArena, mut choose: F) -> Result<()>
where
    F: FnMut(usize) -> usize,
{
    let n = arena.len();
    if n < 2 {
        return Err(ThrashError::TooFewEntries { entries: n });
    }
    for i in 0..n - 1 {
        let choice = choose(i);
        if !(i..n).contains(&choice) {
            return Err(ThrashError::ChoiceOutOfRange {
                index: i,
                choice,
                entries: n,
            });
        }
        swap_entries(arena, i, choice);
    }
    Ok(())
}

/// Shuffles a linked ring with partners drawn uniformly from `rng`.
///
/// # Errors
///
/// Returns [`ThrashError::TooFewEntries`] for arenas smaller than two entries.
pub fn shuffle<R: Rng>(arena: &mut EntryArena, rng: &mut R) -> Result<()> {
    let n = arena.len();
    shuffle_with(arena, |i| rng.gen_range(i..n))
}

/// Links the arena as a ring and shuffles it into a random single cycle.
///
/// # Errors
///
/// Returns [`ThrashError::TooFewEntries`] for arenas smaller than two entries.
pub fn build<R: Rng>(arena: &mut EntryArena, rng: &mut R) -> Result<()> {
    link_ring(arena)?;
    shuffle(arena, rng)?;
    debug!(entries = arena.len(), "built random single cycle");
    Ok(())
}

/// Checks that `next`/`prev` form exactly one cycle over every entry.
///
/// Verifies that every link is in range, that `prev` mirrors `next`, that no entry
/// points at itself, and that following `next` from entry 0 takes exactly N hops to
/// return. Together these rule out sub-cycles and unreachable entries.
///
/// # Errors
///
/// Returns [`ThrashError::BrokenCycle`] describing the first violation.
pub fn check_single_cycle(arena: &EntryArena) -> Result<()> {
    let n = arena.len();
    let broken = |msg: String| Err(ThrashError::BrokenCycle(msg));

    if n < 2 {
        return Err(ThrashError::TooFewEntries { entries: n });
    }

    for (i, entry) in arena.iter().enumerate() {
        if entry.next >= n || entry.prev >= n {
            return broken(format!(
                "entry {i} links out of range (prev {}, next {})",
                entry.prev, entry.next
            ));
        }
        if entry.next == i || entry.prev == i {
            return broken(format!("entry {i} is a self-loop"));
        }
        if arena[entry.next].prev != i {
            return broken(format!(
                "entry {i} -> {} is not mirrored by prev (found {})",
                entry.next, arena[entry.next].prev
            ));
        }
    }

    let mut cursor = arena[0].next;
    let mut hops = 1;
    while cursor != 0 {
        if hops >= n {
            return broken(format!("no return to entry 0 within {n} hops"));
        }
        cursor = arena[cursor].next;
        hops += 1;
    }
    if hops != n {
        return broken(format!("cycle through entry 0 has length {hops}, expected {n}"));
    }
    Ok(())
}
