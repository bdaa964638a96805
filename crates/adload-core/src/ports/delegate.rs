//! Ad load manager delegate port.

use crate::creative::AbstractCreative;
use crate::error::AdLoadError;

/// Receiver of a load attempt's terminal result.
///
/// Exactly one of the two methods is called per attempt, on the manager's
/// dispatch task. The manager holds only a weak reference to its delegate,
/// so a delegate that has been dropped is simply never called.
pub trait AdLoadManagerDelegate: Send + Sync {
    /// All creatives were built; they are in the same order as the models.
    fn creatives_ready(&self, creatives: Vec<AbstractCreative>);

    /// The attempt failed.
    fn load_failed(&self, error: AdLoadError);
}
