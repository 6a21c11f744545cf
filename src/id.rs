//! ID generators for the three WAMP ID scopes (spec §3, §4.8): global
//! (session IDs), router (publication/subscription/registration IDs),
//! and session (request IDs, chosen by the message originator).

use rand::{thread_rng, Rng};

use crate::ID;

/// Upper bound on any WAMP ID: `2^53`, the largest integer a JSON
/// number round-trips exactly through an IEEE754 double.
pub const ID_MAX: u64 = 1u64 << 53;

/// Whether `id` falls in the legal WAMP ID range `[1, 2^53)` (spec §3).
pub fn is_valid_id(id: ID) -> bool {
    (1..ID_MAX).contains(&id)
}

/// Something that hands out fresh IDs within one scope. Implementations
/// may be swapped in tests for deterministic sequences.
pub trait IdGenerator: Send {
    /// Produce an ID not currently in use. `in_use` reports whether a
    /// candidate is already live.
    fn next_id(&mut self, in_use: &mut dyn FnMut(ID) -> bool) -> ID;
}

/// Random-draw-and-retry generator used for the global and router
/// scopes (spec §4.8): uniformly samples `[1, 2^53)` and retries on
/// collision with the live set.
#[derive(Default)]
pub struct RandomIdGenerator;

impl RandomIdGenerator {
    pub fn new() -> RandomIdGenerator {
        RandomIdGenerator
    }
}

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self, in_use: &mut dyn FnMut(ID) -> bool) -> ID {
        let mut rng = thread_rng();
        loop {
            let candidate = rng.gen_range(1..ID_MAX);
            if !in_use(candidate) {
                return candidate;
            }
        }
    }
}

/// Monotonic generator, permitted for the session scope (request IDs
/// chosen by the originator of a request).
pub struct MonotonicIdGenerator {
    next: ID,
}

impl MonotonicIdGenerator {
    pub fn new() -> MonotonicIdGenerator {
        MonotonicIdGenerator { next: 1 }
    }

    pub fn starting_at(start: ID) -> MonotonicIdGenerator {
        MonotonicIdGenerator { next: start }
    }
}

impl Default for MonotonicIdGenerator {
    fn default() -> MonotonicIdGenerator {
        MonotonicIdGenerator::new()
    }
}

impl IdGenerator for MonotonicIdGenerator {
    fn next_id(&mut self, in_use: &mut dyn FnMut(ID) -> bool) -> ID {
        loop {
            let candidate = self.next;
            self.next += 1;
            if !in_use(candidate) {
                return candidate;
            }
        }
    }
}

/// Bundles a router/global-scope generator with the live set it draws
/// against (spec §4.8, §3 invariant 6). `Router` keeps one of these per
/// scope: one for session IDs, one for publication/subscription/
/// registration IDs.
pub struct RouterIds {
    generator: Box<dyn IdGenerator>,
    in_use: std::collections::HashSet<ID>,
}

impl RouterIds {
    pub fn new(generator: Box<dyn IdGenerator>) -> RouterIds {
        RouterIds {
            generator,
            in_use: std::collections::HashSet::new(),
        }
    }

    /// Draw a fresh ID and record it as live.
    pub fn alloc(&mut self) -> ID {
        let id = self.draw();
        self.in_use.insert(id);
        id
    }

    /// Draw a fresh ID without recording it as live — for one-shot IDs
    /// like publications, which never need releasing.
    pub fn alloc_transient(&mut self) -> ID {
        self.draw()
    }

    /// Stop tracking `id` as live, freeing it for reuse.
    pub fn release(&mut self, id: ID) {
        self.in_use.remove(&id);
    }

    fn draw(&mut self) -> ID {
        let in_use = &self.in_use;
        self.generator.next_id(&mut |candidate| in_use.contains(&candidate))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_generator_avoids_in_use_ids() {
        let mut used: HashSet<ID> = (1..1000).collect();
        let mut gen = RandomIdGenerator::new();
        let id = gen.next_id(&mut |id| used.contains(&id));
        assert!(!used.contains(&id));
        assert!(id >= 1 && id < ID_MAX);
    }

    #[test]
    fn monotonic_generator_increments_and_skips_in_use() {
        let mut used: HashSet<ID> = HashSet::new();
        used.insert(2);
        let mut gen = MonotonicIdGenerator::new();
        assert_eq!(gen.next_id(&mut |id| used.contains(&id)), 1);
        assert_eq!(gen.next_id(&mut |id| used.contains(&id)), 3);
    }

    #[test]
    fn router_ids_does_not_reissue_live_ids() {
        let mut ids = RouterIds::new(Box::new(MonotonicIdGenerator::new()));
        let a = ids.alloc();
        let b = ids.alloc();
        assert_ne!(a, b);
        ids.release(a);
        let c = ids.alloc();
        assert_ne!(b, c);
    }
}
