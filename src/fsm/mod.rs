//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern, driving one scan/decision exchange:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌──────────────────┬───────────┬──────────┬───────────────────┐│
//! │  │ StateId          │ on_enter  │ on_exit  │ on_update         ││
//! │  ├──────────────────┼───────────┼──────────┼───────────────────┤│
//! │  │ Idle             │ fn(ctx)   │   -      │ fn(ctx)->Option<> ││
//! │  │ ScanSent         │ fn(ctx)   │   -      │ fn(ctx)->Option<> ││
//! │  │ AwaitingDecision │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> ││
//! │  │ Granted          │ fn(ctx)   │   -      │ fn(ctx)->Option<> ││
//! │  │ Denied           │ fn(ctx)   │   -      │ fn(ctx)->Option<> ││
//! │  │ TimedOut         │ fn(ctx)   │   -      │ fn(ctx)->Option<> ││
//! │  └──────────────────┴───────────┴──────────┴───────────────────┘│
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  Handlers never touch I/O: they read the clock
//! reading and decision placed in [`ExchangeContext`] and raise
//! commands the control loop executes.

pub mod context;
pub mod states;

use context::ExchangeContext;
use log::debug;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    ScanSent = 1,
    AwaitingDecision = 2,
    Granted = 3,
    Denied = 4,
    TimedOut = 5,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::ScanSent,
            2 => Self::AwaitingDecision,
            3 => Self::Granted,
            4 => Self::Denied,
            5 => Self::TimedOut,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    /// One of the three terminal outcomes of an exchange.
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Granted | Self::Denied | Self::TimedOut)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut ExchangeContext);

/// Per-tick update handler.  Returns `Some(next)` to transition.
pub type StateUpdateFn = fn(&mut ExchangeContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ExchangeContext) {
        debug!("exchange FSM starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut ExchangeContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        if let Some(next_id) = (self.table[self.current].on_update)(ctx) {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition, bypassing `on_update`.  Used to
    /// abandon an exchange whose scan never left the device.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut ExchangeContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut ExchangeContext) {
        let next_idx = next_id as usize;

        debug!(
            "exchange FSM: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
