use crate::error::Result;

/// The block in which an operation executes.
///
/// Operations never read wall-clock time; maturity is always decided by
/// comparing stored timestamps against `time`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockCtx {
    pub height: u64,
    /// Block time, in seconds.
    pub time: u64,
}

impl BlockCtx {
    pub fn new(height: u64, time: u64) -> Self {
        BlockCtx { height, time }
    }
}

/// A state machine which applies actions in sequence.
///
/// A step which returns an error must leave the state exactly as it was
/// before the step.
pub trait StateMachine<A> {
    type Output;

    fn step(&mut self, ctx: &BlockCtx, action: A) -> Result<Self::Output>;
}
