//! Rule-Based Recommendation Fallback
//!
//! Deterministic advisors used when the generative service is mocked or fails:
//! harvest window, sell/wait decision and yield estimate. Also owns the
//! advisory request/response wire types shared with the live advisor.

mod engine;
mod harvest;
mod lenient;
mod quantity;
mod sell;
mod text;

pub use engine::{FallbackConfig, FallbackEngine};
pub use harvest::{HarvestAdvice, HarvestRequest};
pub use lenient::ViabilityHint;
pub use quantity::{YieldEstimate, YieldRequest};
pub use sell::{BuyerOffer, FactorStatus, SellAdvice, SellDecision, SellRequest};
pub use text::format_rupees;
