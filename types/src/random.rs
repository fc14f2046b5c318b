//! Random draw seam for reference number allocation.

/// Source of candidate reference numbers.
///
/// Production code draws uniformly from `[low, high]`; tests substitute a
/// scripted sequence (see `regsync-nullables`).
pub trait RefDraw: Send {
    /// Draw a candidate in the inclusive range `[low, high]`.
    fn draw(&mut self, low: u64, high: u64) -> u64;
}
