//! DST transition policies for wall-clock times.

use serde::{Deserialize, Serialize};

/// Policy for local times that fall in a DST gap (e.g., 2:30 AM during spring forward).
///
/// Ambiguous times during fall-back are not governed by this policy: they
/// always resolve to the later of the two instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DstPolicy {
    /// Skip instances that fall in the DST gap.
    Skip,
    /// Move the instance forward by the length of the gap (02:30 becomes 03:30).
    #[default]
    ShiftForward,
}
