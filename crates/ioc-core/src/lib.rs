//! In-process Inter-Object Communication: EVT/CMD/DAT over services and links.
//!
//! # Purpose
//!
//! This crate provides three unified messaging primitives between
//! cooperating components of the same process: fire-and-forget events
//! (EVT), synchronous request/response commands (CMD), and reliable
//! byte-stream data chunks (DAT). Components connect over explicit
//! point-to-point links or the implicit process-global Conles bus.
//!
//! # Mental model
//!
//! A [`ServiceObject`](service::ServiceObject) is onlined at a [`Uri`](ioc_proto::Uri) and
//! accepts connections into [`LinkObject`](link::LinkObject) pairs. Each
//! pair carries exactly one primitive; the "receiving" half (Consumer,
//! Executor, Receiver) owns the queue or rendezvous slot, the "sending"
//! half reaches across to it through the [`Registry`](registry::Registry).
//! The Conles bus is a second, process-global entry point for EVT that
//! needs no service at all.
//!
//! # Key types
//!
//! | Type | Role |
//! | --- | --- |
//! | [`registry::Registry`] | Process-global URI/id lookup; where peers find each other. |
//! | [`service::ServiceObject`] | Accept queue, capability bitmap, broadcast fan-out. |
//! | [`link::LinkObject`] | Per-link state machine and primitive-specific queue side. |
//! | [`queue::BoundedQueue`] | Shared bounded FIFO behind EVT, DAT, and CMD's rendezvous slot. |
//! | [`conles`] | The connectionless event bus singleton. |
//!
//! # Invariants
//!
//! - Stale id rejection: every operation against a closed `LinkId`/`SrvId` returns `NotExistLink`/`NotExistService`.
//!   - Enforced in: `api::close_link`, `registry::Registry::remove_link`
//!   - Tested by: `tests::lifecycle::closed_link_rejects_further_ops`
//!   - Failure symptom: an operation silently succeeding against a torn-down link.
//!
//! - Per-link FIFO: each queue's accepted order equals its delivered order.
//!   - Enforced in: `queue::BoundedQueue`
//!   - Tested by: `tests::dat::chunks_arrive_in_send_order`
//!   - Failure symptom: reordered bytes on a DAT link.
//!
//! - Conles subscribe/unsubscribe ordering: a subscription registered (removed) before a post is processed by the bus's single mailbox observes (does not observe) that post.
//!   - Enforced in: `conles::actor::ConlesActor::run`
//!   - Tested by: `tests::conles::echo_then_unsubscribe_stops_delivery`
//!   - Failure symptom: a post delivered to an already-unsubscribed callback, or missed by a subscription registered just before it.
//!
//! - CMD single result: exactly one of {Success, Timeout, LinkBroken, NoCmdExecutor} is observed per `execCMD` call.
//!   - Enforced in: `delivery::cmd::exec_cmd`
//!   - Tested by: `tests::cmd::ping_pong_round_trip`
//!   - Failure symptom: an initiator hanging forever, or observing two results for one command.
//!
//! # Data flow
//!
//! 1. `onlineService` reserves a `Uri` in the [`Registry`] and spawns the auto-accept worker if configured.
//! 2. `connectService` allocates a link pair, registers the accepted half on the service's accept queue, and returns the client half's id immediately.
//! 3. `acceptClient` (manual) or the auto-accept worker drains that queue and marks the link as accepted.
//! 4. `postEVT`/`execCMD`/`sendDAT` resolve the peer through the [`Registry`] and apply the primitive's option-matrix dispatch in `delivery::*`.
//! 5. Delivery workers, spawned when a callback is registered, drain each queue and invoke the registered callback.
//!
//! # Lifecycle
//!
//! - Startup: the [`Registry`] and [`conles`] bus are lazily initialized on first use via `OnceLock`; `registry::init`/`conles::init` may configure them before that.
//! - Link: `Init -> Attaching -> Connected -> Closing -> Closed`, see [`link::LinkState`].
//! - Service: `onlineService` -> accept loop -> `offlineService`, which cascade-closes accepted links unless `KeepAcceptedLink` is set.
//!
//! # Concurrency & ordering
//!
//! Per-link, per-primitive FIFO is guaranteed. Across primitives on the same
//! link, and across links, there is no ordering guarantee -- each primitive
//! has its own lock and its own queue. The Conles bus's single actor mailbox
//! gives it the subscribe/post ordering guarantee above for free.
//!
//! # Failure modes & recovery
//!
//! - Send/recv failure: a full or empty queue under `NonBlock`/`Timeout` returns the primitive-specific error from [`error::IocError`] rather than blocking forever.
//! - Link teardown mid-operation: `closeLink`/cascade close aborts the link's worker tasks and releases anyone still waiting with `LinkBroken`.
//! - Deadlock: callbacks run on dedicated worker tasks and must never re-enter a blocking call on the same link; this crate documents that contract rather than enforcing it at runtime, matching how the corpus this crate is drawn from treats cross-service reentrancy hazards.
//!
//! # Recipes
//!
//! - Adding a new primitive option: extend [`ioc_proto::RawOptions`]/[`ioc_proto::OptionSet`] and the canonicalization rule in the relevant `delivery::*` module.
//! - Standing up a broadcast service: `onlineService` with `SrvFlags { broadcast_event: true, auto_accept: true, .. }`, then `postEVT(SrvId, ...)`.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod conles;
pub mod delivery;
pub mod error;
pub mod id;
pub mod link;
pub mod queue;
pub mod registry;
pub mod service;
pub mod time;

pub use api::*;
pub use error::{IocError, Result};

#[cfg(test)]
mod tests;
