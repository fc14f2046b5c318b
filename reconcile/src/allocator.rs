//! Reference number allocation.
//!
//! Candidates are drawn uniformly from `[lower, upper]` and checked against
//! an in-memory used-set seeded once from the loaded records. Each number
//! joins the used-set the moment it is handed out, so no two records in one
//! run can collide. After `widen_after` consecutive collisions for the same
//! record the upper bound grows by `widen_by`.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use regsync_store::{FieldSet, RecordFilter, WriteOp};
use regsync_types::{RecordId, RefDraw, RefNumber, UserRecord};

/// Allocation range and widening policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefBounds {
    pub lower: u64,
    pub upper: u64,
    pub widen_after: u32,
    pub widen_by: u64,
}

impl Default for RefBounds {
    fn default() -> Self {
        Self {
            lower: 20_000,
            upper: 99_999,
            widen_after: 100,
            widen_by: 100_000,
        }
    }
}

/// Uniform draws from a seeded [`StdRng`].
pub struct UniformDraw {
    rng: StdRng,
}

impl UniformDraw {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RefDraw for UniformDraw {
    fn draw(&mut self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// One assigned number and how many draws collided before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub ref_number: RefNumber,
    pub wasted: u32,
}

/// Every assignment of one allocation phase, ready to be written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationPlan {
    pub assigned: Vec<(RecordId, RefNumber)>,
    pub wasted: u64,
}

impl AllocationPlan {
    pub fn ops(&self) -> Vec<WriteOp> {
        self.assigned
            .iter()
            .map(|(id, n)| WriteOp::Update {
                id: id.clone(),
                set: FieldSet {
                    ref_number: Some(*n),
                    ..Default::default()
                },
            })
            .collect()
    }
}

pub struct RefAllocator<'a> {
    used: HashSet<RefNumber>,
    bounds: RefBounds,
    draw: &'a mut dyn RefDraw,
}

impl<'a> RefAllocator<'a> {
    pub fn new(
        used: impl IntoIterator<Item = RefNumber>,
        bounds: RefBounds,
        draw: &'a mut dyn RefDraw,
    ) -> Self {
        Self {
            used: used.into_iter().collect(),
            bounds,
            draw,
        }
    }

    /// Current (possibly widened) upper bound.
    pub fn upper(&self) -> u64 {
        self.bounds.upper
    }

    pub fn is_used(&self, n: RefNumber) -> bool {
        self.used.contains(&n)
    }

    pub fn allocate(&mut self) -> Allocation {
        let widen_after = self.bounds.widen_after.max(1);
        let mut wasted = 0u32;
        let mut streak = 0u32;
        loop {
            let candidate = RefNumber::new(self.draw.draw(self.bounds.lower, self.bounds.upper));
            if self.used.insert(candidate) {
                return Allocation {
                    ref_number: candidate,
                    wasted,
                };
            }
            wasted = wasted.saturating_add(1);
            streak += 1;
            if streak >= widen_after {
                streak = 0;
                self.bounds.upper = self.bounds.upper.saturating_add(self.bounds.widen_by.max(1));
                tracing::warn!(
                    upper = self.bounds.upper,
                    collisions = wasted,
                    "reference range crowded, widening upper bound"
                );
            }
        }
    }

    /// Assign a number to every record that lacks one, in input order.
    pub fn allocate_missing(&mut self, records: &[UserRecord]) -> AllocationPlan {
        let mut plan = AllocationPlan::default();
        for record in RecordFilter::MissingRefNumber.select(records) {
            let allocation = self.allocate();
            tracing::debug!(
                record = %record.id,
                ref_number = %allocation.ref_number,
                wasted = allocation.wasted,
                "reference number assigned"
            );
            plan.wasted += u64::from(allocation.wasted);
            plan.assigned.push((record.id.clone(), allocation.ref_number));
        }
        plan
    }
}
