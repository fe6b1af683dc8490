use super::Dir;
use crate::error::GridError;
use std::ops::{Add, Index, Neg};

/// Sentinel written into a cost slot to request closing that direction.
/// Any value below -1.0 is interpreted as a close request; this constant is
/// the canonical one, chosen so its magnitude survives negation and can be
/// recognized again by the inverse operation.
pub const CLOSE: f64 = f64::MIN;

/// Whether a slot value is a close request rather than an additive cost.
#[inline(always)]
pub fn is_close(v: f64) -> bool {
    v < -1.0
}

/// Per-direction cost vector around one grid node: one `f64` slot for each
/// of the eight outgoing directions. Additive slots hold cost deltas; slots
/// below -1.0 request closing the direction outright.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeCost {
    slots: [f64; 8],
}

impl NodeCost {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.slots.iter().all(|&v| v == 0.0)
    }

    pub fn get(&self, d: Dir) -> f64 {
        self.slots[d.index()]
    }

    /// Raw-index access; out-of-range indices are a caller bug.
    pub fn try_get(&self, i: usize) -> Result<f64, GridError> {
        if i < 8 {
            Ok(self.slots[i])
        } else {
            Err(GridError::InvalidDirection(i))
        }
    }

    pub fn set(&mut self, d: Dir, v: f64) {
        self.slots[d.index()] = v;
    }

    /// Marks a direction for closing.
    pub fn close(&mut self, d: Dir) {
        self.slots[d.index()] = CLOSE;
    }

    pub fn is_closed(&self, d: Dir) -> bool {
        is_close(self.slots[d.index()])
    }

    /// Adds an additive penalty to a slot. The result is kept above -1.0 so
    /// that accumulated penalties can never drift into the close-sentinel
    /// range; only `close` may put a slot there.
    pub fn add(&mut self, d: Dir, v: f64) {
        let i = d.index();
        if is_close(self.slots[i]) {
            return;
        }
        self.slots[i] = (self.slots[i] + v).max(-1.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dir, f64)> + '_ {
        Dir::all().map(|d| (d, self.slots[d.index()]))
    }
}

impl Add for NodeCost {
    type Output = NodeCost;

    /// Slot-wise sum. A close request on either side wins the slot, keeping
    /// the sentinel magnitude intact.
    fn add(self, rhs: NodeCost) -> NodeCost {
        let mut out = NodeCost::zero();
        for i in 0..8 {
            out.slots[i] = if is_close(self.slots[i]) || is_close(rhs.slots[i]) {
                CLOSE
            } else {
                self.slots[i] + rhs.slots[i]
            };
        }
        out
    }
}

impl Neg for NodeCost {
    type Output = NodeCost;

    fn neg(self) -> NodeCost {
        let mut out = self;
        for v in &mut out.slots {
            *v = -*v;
        }
        out
    }
}

impl Index<Dir> for NodeCost {
    type Output = f64;

    fn index(&self, d: Dir) -> &f64 {
        &self.slots[d.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(i: usize) -> Dir {
        Dir::new(i).unwrap()
    }

    #[test]
    fn raw_access_checks_range() {
        let c = NodeCost::zero();
        assert_eq!(c.try_get(7).unwrap(), 0.0);
        assert!(matches!(
            c.try_get(8),
            Err(GridError::InvalidDirection(8))
        ));
    }

    #[test]
    fn addition_is_slot_wise_and_close_dominates() {
        let mut a = NodeCost::zero();
        a.set(d(0), 1.5);
        a.close(d(4));
        let mut b = NodeCost::zero();
        b.set(d(0), 0.5);
        b.set(d(4), 2.0);

        let s = a + b;
        assert_eq!(s.get(d(0)), 2.0);
        assert!(s.is_closed(d(4)));
        assert_eq!(s.get(d(4)), CLOSE);
        assert_eq!(s.get(d(1)), 0.0);
    }

    #[test]
    fn additive_slots_never_reach_the_sentinel_range() {
        let mut c = NodeCost::zero();
        NodeCost::add(&mut c, d(2), -5.0);
        assert_eq!(c.get(d(2)), -1.0);
        assert!(!c.is_closed(d(2)));

        c.close(d(2));
        NodeCost::add(&mut c, d(2), 10.0);
        assert!(c.is_closed(d(2)));
    }

    #[test]
    fn negation_flips_every_slot() {
        let mut c = NodeCost::zero();
        c.set(d(1), 2.5);
        c.set(d(6), -0.5);
        let n = -c;
        assert_eq!(n.get(d(1)), -2.5);
        assert_eq!(n.get(d(6)), 0.5);
    }
}
