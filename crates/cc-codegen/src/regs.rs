//! Virtual register allocation (spec §4.2 "Register allocation"): a fixed
//! pool of four general-purpose logical registers, no liveness analysis,
//! spill-on-reuse instead.
//!
//! `V0`/`ReturnValue` share one physical register on every backend
//! (`TargetBackend::reg_index` maps both to 0), so acquiring `V0` and
//! reading a just-returned call result are the same operation.

use cc_target::{CodeBuffer, TargetBackend, VReg};

const POOL: [VReg; 4] = [VReg::V0, VReg::V1, VReg::V2, VReg::V3];

/// One checked-out register. Holds no payload; its only job is to make
/// "did this get released" a type-level question via `RegPool::release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegTicket(pub VReg);

/// Tracks which of the four scratch registers are live and in what order
/// they were acquired, so that running out triggers a spill of the
/// least-recently-acquired one rather than an arbitrary one.
#[derive(Debug, Default)]
pub struct RegPool {
    /// Acquisition order; the front is the next spill candidate.
    order: Vec<VReg>,
    /// Registers currently pushed to the stack as a spill, in push order
    /// (LIFO) — popped back in `release` once the spilling acquisition's
    /// ticket is released.
    spilled: Vec<VReg>,
}

impl RegPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a register, preferring `want` when given and free. If every
    /// register in `POOL` is live, spills the oldest live one to the stack
    /// (`push`) and hands its slot to the new ticket — spec: "no liveness
    /// analysis; a register that must be reused while still live is spilled
    /// to the stack with `push`/`pop` around the reuse."
    pub fn acquire(&mut self, backend: &mut dyn TargetBackend, code: &mut CodeBuffer, want: Option<VReg>) -> RegTicket {
        if let Some(r) = want {
            if let Some(pos) = self.order.iter().position(|&x| x == r) {
                self.order.remove(pos);
            } else if self.order.len() >= POOL.len() {
                self.spill_oldest(backend, code);
            }
            self.order.push(r);
            return RegTicket(r);
        }

        if self.order.len() >= POOL.len() {
            self.spill_oldest(backend, code);
        }
        let next = POOL.into_iter().find(|r| !self.order.contains(r)).expect("pool has a free slot after spill");
        self.order.push(next);
        RegTicket(next)
    }

    fn spill_oldest(&mut self, backend: &mut dyn TargetBackend, code: &mut CodeBuffer) {
        let victim = self.order.remove(0);
        backend.push(code, victim);
        self.spilled.push(victim);
    }

    /// Release a previously acquired register. If a spill is outstanding
    /// (`self.spilled` non-empty), restore it now with `pop` — this keeps
    /// the stack a strict LIFO matching the acquisition order, so a ticket
    /// must be released before an older spilled register can be restored.
    pub fn release(&mut self, backend: &mut dyn TargetBackend, code: &mut CodeBuffer, ticket: RegTicket) {
        if let Some(pos) = self.order.iter().position(|&x| x == ticket.0) {
            self.order.remove(pos);
        }
        if let Some(victim) = self.spilled.pop() {
            backend.pop(code, victim);
            self.order.push(victim);
        }
    }

    /// True if acquiring one more register right now would force a spill.
    pub fn is_full(&self) -> bool {
        self.order.len() >= POOL.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_target::X86Backend;

    #[test]
    fn acquires_distinct_registers_until_exhausted() {
        let mut pool = RegPool::new();
        let mut backend = X86Backend::default();
        let mut code = CodeBuffer::new();
        let a = pool.acquire(&mut backend, &mut code, None);
        let b = pool.acquire(&mut backend, &mut code, None);
        let c = pool.acquire(&mut backend, &mut code, None);
        let d = pool.acquire(&mut backend, &mut code, None);
        assert_ne!(a.0, b.0);
        assert_ne!(b.0, c.0);
        assert_ne!(c.0, d.0);
        assert!(pool.is_full());
    }

    #[test]
    fn fifth_acquisition_spills_the_oldest() {
        let mut pool = RegPool::new();
        let mut backend = X86Backend::default();
        let mut code = CodeBuffer::new();
        let a = pool.acquire(&mut backend, &mut code, None);
        let _b = pool.acquire(&mut backend, &mut code, None);
        let _c = pool.acquire(&mut backend, &mut code, None);
        let _d = pool.acquire(&mut backend, &mut code, None);
        let before = code.len();
        let e = pool.acquire(&mut backend, &mut code, None);
        assert_eq!(e.0, a.0, "oldest acquisition is the spill victim and its slot is reused");
        assert!(code.len() > before, "spilling emits a push");
    }

    #[test]
    fn release_restores_a_spilled_register() {
        let mut pool = RegPool::new();
        let mut backend = X86Backend::default();
        let mut code = CodeBuffer::new();
        let a = pool.acquire(&mut backend, &mut code, None);
        let _b = pool.acquire(&mut backend, &mut code, None);
        let _c = pool.acquire(&mut backend, &mut code, None);
        let _d = pool.acquire(&mut backend, &mut code, None);
        let e = pool.acquire(&mut backend, &mut code, None);
        let before = code.len();
        pool.release(&mut backend, &mut code, e);
        assert!(code.len() > before, "releasing the spilling ticket pops the spilled register back");
    }
}
