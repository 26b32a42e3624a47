//! AI second opinion: provider contract, timeouts, and reconciliation with
//! the keyword ceiling.

pub mod assess;
pub mod opinion;
pub mod reconcile;

pub use assess::{Assessor, EnhancedAssessment, Evidence, EvidenceOrigin};
pub use opinion::{AiError, AiOpinion, AiProvider, FileProvider, fetch_opinion};
pub use reconcile::{DowngradeDecision, ReconcileOutcome, resolve_downgrade};
