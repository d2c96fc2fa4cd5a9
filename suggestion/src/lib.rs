pub mod predictive;
pub mod proposal;
pub mod reactive;

pub use predictive::predictive_proposals;
pub use proposal::{Algorithm, Proposal, ProposalReason};
pub use reactive::reactive_proposals;
