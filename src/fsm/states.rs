//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers; no closures, no heap.
//!
//! ```text
//!  IDLE ──[scan requested]──▶ SCAN_SENT ──[immediate]──▶ AWAITING_DECISION
//!    ▲                                                      │   │   │
//!    │                                          [GRANT]─────┘   │   └──[deadline]
//!    │                                             ▼            │            ▼
//!    │                                          GRANTED    [DENY5]       TIMED_OUT
//!    │                                             │            ▼            │
//!    └─────────────────[next tick]─────────────────┴────────  DENIED ────────┘
//! ```
//!
//! A decision is matched by content only; the gateway does not echo the
//! scan's sequence number, so any GRANT/DENY5 heard while waiting resolves
//! the open exchange.

use log::{info, warn};

use super::context::{Exchange, ExchangeCommands, ExchangeContext, ExchangeOutcome, Resolution};
use super::{StateDescriptor, StateId};
use crate::protocol::tokens::Decision;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::ScanSent,
            name: "ScanSent",
            on_enter: Some(scan_sent_enter),
            on_exit: None,
            on_update: scan_sent_update,
        },
        StateDescriptor {
            id: StateId::AwaitingDecision,
            name: "AwaitingDecision",
            on_enter: Some(awaiting_enter),
            on_exit: Some(awaiting_exit),
            on_update: awaiting_update,
        },
        StateDescriptor {
            id: StateId::Granted,
            name: "Granted",
            on_enter: Some(granted_enter),
            on_exit: None,
            on_update: resolved_update,
        },
        StateDescriptor {
            id: StateId::Denied,
            name: "Denied",
            on_enter: Some(denied_enter),
            on_exit: None,
            on_update: resolved_update,
        },
        StateDescriptor {
            id: StateId::TimedOut,
            name: "TimedOut",
            on_enter: Some(timed_out_enter),
            on_exit: None,
            on_update: resolved_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut ExchangeContext) {
    ctx.exchange = None;
    ctx.inbound = None;
    ctx.commands = ExchangeCommands::default();
}

fn idle_update(ctx: &mut ExchangeContext) -> Option<StateId> {
    // No exchange to resolve; a stray decision is dropped.
    ctx.inbound = None;

    if ctx.scan_requested {
        return Some(StateId::ScanSent);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SCAN_SENT
// ═══════════════════════════════════════════════════════════════════════════

fn scan_sent_enter(ctx: &mut ExchangeContext) {
    ctx.scan_requested = false;
    ctx.exchange = Some(Exchange {
        sequence: None,
        deadline_ms: ctx.now_ms + u64::from(ctx.response_window_ms),
        outcome: Resolution::Pending,
    });
    ctx.commands.transmit_scan = true;
}

fn scan_sent_update(_ctx: &mut ExchangeContext) -> Option<StateId> {
    Some(StateId::AwaitingDecision)
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_DECISION
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_enter(ctx: &mut ExchangeContext) {
    if let Some(ex) = ctx.exchange {
        info!(
            "waiting for decision (seq={:?}, deadline={}ms)",
            ex.sequence, ex.deadline_ms
        );
    }
}

fn awaiting_exit(ctx: &mut ExchangeContext) {
    ctx.inbound = None;
}

fn awaiting_update(ctx: &mut ExchangeContext) -> Option<StateId> {
    match ctx.inbound.take() {
        Some(Decision::Grant) => return Some(StateId::Granted),
        Some(Decision::Deny) => return Some(StateId::Denied),
        None => {}
    }
    if ctx.deadline_passed() {
        return Some(StateId::TimedOut);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  Terminal outcomes
// ═══════════════════════════════════════════════════════════════════════════

fn granted_enter(ctx: &mut ExchangeContext) {
    ctx.resolve(ExchangeOutcome::Granted);
    ctx.commands.actuate_grant = true;
    info!("ACCESS GRANTED");
}

fn denied_enter(ctx: &mut ExchangeContext) {
    ctx.resolve(ExchangeOutcome::Denied);
    info!("ACCESS DENIED");
}

fn timed_out_enter(ctx: &mut ExchangeContext) {
    ctx.resolve(ExchangeOutcome::TimedOut);
    warn!("no decision within {}ms", ctx.response_window_ms);
}

fn resolved_update(_ctx: &mut ExchangeContext) -> Option<StateId> {
    Some(StateId::Idle)
}
