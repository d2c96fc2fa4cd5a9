/// Why a [`Proposal`] was raised, carrying the algorithm's confidence in
/// its own shortfall estimate (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposalReason {
    pub algorithm: Algorithm,
    pub confidence_percent: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Predictive,
    Reactive,
}

/// A candidate batch a suggestion engine thinks should be baked. Acceptance
/// is always the caller's choice — neither engine mutates state (§4.4, §7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub item_guid: String,
    pub quantity: u32,
    pub start_time: u32,
    pub reason: ProposalReason,
}
