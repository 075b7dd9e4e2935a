//! scavgrid-dispatch: carries dispatch plans out through the control surface.
//!
//! A fleet pass opens one session on the [`GameStateProvider`], then visits
//! sites strictly one after another:
//!
//! ```text
//! FleetPass::run
//!   ├── open_session()                 fatal on failure
//!   ├── pre-filter every site          observe slots + units → tracker
//!   └── per candidate site
//!       ├── compute_plan()             scavgrid-planner
//!       └── SiteExecutor::dispatch()
//!           ├── round 1: wait available (≤ N observations) → submit → verify
//!           └── round 2: resubmit unconfirmed slots once, ascending level
//! ```
//!
//! Per-slot and per-site failures are recorded in the [`PassReport`] and
//! never abort the pass. Only a failure to open the session does.

pub mod error;
pub mod executor;
pub mod pass;
pub mod provider;
pub mod sim;

pub use error::{DispatchError, DispatchResult};
pub use executor::{ExecutorSettings, SiteDispatchResult, SiteExecutor, SlotOutcome, SlotReport};
pub use pass::{FleetPass, PassReport, SiteSkip};
pub use provider::{BoxFuture, ConfigProvider, GameSession, GameStateProvider, SubmitReceipt};
pub use sim::SimulatedWorld;
