//! Identifiers, URIs, and wire descriptors for the IOC messaging primitives.
//!
//! This module defines the data exchanged across every public entry point:
//! service and link identifiers, service URIs, and the EVT/CMD/DAT
//! descriptors themselves. None of these types carry behavior beyond
//! construction helpers and the option canonicalization in [`OptionSet`].

use serde::{Deserialize, Serialize};

/// Sentinel value for an identifier that does not refer to any live object.
pub const IOC_ID_INVALID: u64 = 0;

/// Opaque identifier for a [`ServiceObject`](crate) online in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SrvId(pub u64);

impl SrvId {
	/// The sentinel value denoting "no service".
	pub const INVALID: SrvId = SrvId(IOC_ID_INVALID);

	/// Whether this id is the invalid sentinel.
	#[must_use]
	pub fn is_valid(self) -> bool {
		self.0 != IOC_ID_INVALID
	}
}

/// Opaque identifier for a link, either a connected pair member or the
/// Conles auto-link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl LinkId {
	/// The sentinel value denoting "no link".
	pub const INVALID: LinkId = LinkId(IOC_ID_INVALID);

	/// Whether this id is the invalid sentinel.
	#[must_use]
	pub fn is_valid(self) -> bool {
		self.0 != IOC_ID_INVALID
	}
}

/// A monotonic per-link sequence number, used for ordering diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seq(pub u64);

/// Service endpoint address.
///
/// Equality is exact-match across all four components. `FIFO` protocol with
/// host `LOCAL_PROCESS` denotes the in-process transport; other protocol
/// strings are accepted but their transport semantics are not implemented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri {
	/// Transport protocol identifier, e.g. `"fifo"`.
	pub protocol: String,
	/// Host component, e.g. `"local_process"`.
	pub host: String,
	/// Path component distinguishing services on the same host.
	pub path: String,
	/// Port component; `0` when the protocol has no notion of ports.
	pub port: u16,
}

impl Uri {
	/// Build an in-process `FIFO` URI at the given path.
	#[must_use]
	pub fn fifo(path: impl Into<String>) -> Self {
		Self {
			protocol: "fifo".to_string(),
			host: "local_process".to_string(),
			path: path.into(),
			port: 0,
		}
	}
}

impl std::fmt::Display for Uri {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}://{}{}:{}", self.protocol, self.host, self.path, self.port)
	}
}

/// Complementary role pairs a link may be installed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usage {
	/// Emits events; pairs with [`Usage::EvtConsumer`].
	EvtProducer,
	/// Consumes events; pairs with [`Usage::EvtProducer`].
	EvtConsumer,
	/// Issues commands and awaits their result; pairs with [`Usage::CmdExecutor`].
	CmdInitiator,
	/// Executes commands and produces their result; pairs with [`Usage::CmdInitiator`].
	CmdExecutor,
	/// Sends data chunks; pairs with [`Usage::DatReceiver`].
	DatSender,
	/// Receives data chunks; pairs with [`Usage::DatSender`].
	DatReceiver,
}

impl Usage {
	/// The role a peer link must hold to be compatible with this one.
	#[must_use]
	pub fn complement(self) -> Usage {
		match self {
			Usage::EvtProducer => Usage::EvtConsumer,
			Usage::EvtConsumer => Usage::EvtProducer,
			Usage::CmdInitiator => Usage::CmdExecutor,
			Usage::CmdExecutor => Usage::CmdInitiator,
			Usage::DatSender => Usage::DatReceiver,
			Usage::DatReceiver => Usage::DatSender,
		}
	}
}

/// Flags controlling a [`ServiceObject`](crate) accept loop and lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvFlags {
	/// Accept connections automatically instead of requiring `acceptClient`.
	pub auto_accept: bool,
	/// Allow `postEVT(SrvID, ...)` to fan out to every accepted consumer.
	pub broadcast_event: bool,
	/// Do not cascade-close accepted links when the service goes offline.
	pub keep_accepted_link: bool,
}

/// Arguments to bring a [`ServiceObject`](crate) online.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrvArgs {
	/// The address to advertise and reserve in the registry.
	pub uri: Uri,
	/// Roles this service can accept a link under.
	pub capabilities: Vec<Usage>,
	/// Lifecycle flags.
	pub flags: SrvFlags,
}

impl SrvArgs {
	/// Start building [`SrvArgs`] for the given URI and a single capability.
	#[must_use]
	pub fn new(uri: Uri, capability: Usage) -> Self {
		Self {
			uri,
			capabilities: vec![capability],
			flags: SrvFlags::default(),
		}
	}
}

/// Arguments to connect a new link to an online service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnArgs {
	/// Address of the service to connect to.
	pub uri: Uri,
	/// Role this end of the link will hold.
	pub usage: Usage,
}

/// An event descriptor carried by `postEVT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvtDesc {
	/// Application-defined event identifier.
	pub evt_id: u32,
	/// Event payload bytes.
	pub payload: Vec<u8>,
	/// Per-link sequence number, assigned on enqueue.
	pub seq: Seq,
	/// Monotonic timestamp (microseconds since an unspecified epoch).
	pub timestamp_us: u64,
}

impl EvtDesc {
	/// Build a descriptor for the given event id and payload.
	///
	/// `seq` and `timestamp_us` are filled in by the delivery engine on
	/// enqueue; callers pass placeholder values here.
	#[must_use]
	pub fn new(evt_id: u32, payload: impl Into<Vec<u8>>) -> Self {
		Self {
			evt_id,
			payload: payload.into(),
			seq: Seq(0),
			timestamp_us: 0,
		}
	}
}

/// Outcome of an executed command, carried back on [`CmdDesc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmdStatus {
	/// Awaiting pickup by an executor.
	Pending,
	/// Picked up by an executor, awaiting `ackCMD`.
	Processing,
	/// Completed with a result payload.
	Success,
	/// Completed with a non-success application-level result.
	Failed,
	/// Abandoned after the initiator's timeout elapsed.
	Abandoned,
}

/// A command descriptor carried by `execCMD` / `waitCMD` / `ackCMD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmdDesc {
	/// Application-defined command identifier.
	pub cmd_id: u32,
	/// Request payload supplied by the initiator.
	pub in_payload: Vec<u8>,
	/// Result payload filled in by the executor via `ackCMD`.
	pub out_payload: Vec<u8>,
	/// Current status of this command.
	pub status: CmdStatus,
	/// Per-link sequence number, assigned on enqueue.
	pub seq: Seq,
}

impl CmdDesc {
	/// Build a pending command descriptor for the given id and request payload.
	#[must_use]
	pub fn new(cmd_id: u32, in_payload: impl Into<Vec<u8>>) -> Self {
		Self {
			cmd_id,
			in_payload: in_payload.into(),
			out_payload: Vec::new(),
			status: CmdStatus::Pending,
			seq: Seq(0),
		}
	}
}

/// A data chunk descriptor carried by `sendDAT` / `recvDAT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatDesc {
	/// Chunk payload bytes.
	pub bytes: Vec<u8>,
	/// Set when this chunk is the last one of a logical message.
	pub is_final: bool,
	/// Per-link sequence number, assigned on enqueue.
	pub seq: Seq,
}

impl DatDesc {
	/// Build a descriptor for the given chunk bytes.
	#[must_use]
	pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
		Self {
			bytes: bytes.into(),
			is_final: false,
			seq: Seq(0),
		}
	}
}

/// Synchronous/asynchronous dispatch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
	/// Enqueue and return; delivery happens on a worker task.
	Async,
	/// Dispatch inline on the caller when the queue is empty.
	Sync,
}

/// Blocking discipline applied when an operation cannot proceed immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blocking {
	/// Wait indefinitely.
	MayBlock,
	/// Fail immediately rather than wait.
	NonBlock,
	/// Wait up to the given duration before failing.
	Timeout(std::time::Duration),
}

/// Delivery reliability discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
	/// Never silently drop; caller observes backpressure or failure instead.
	NoDrop,
	/// Prefer dropping (implemented as the Async+NonBlock path) over waiting.
	MayDrop,
}

/// Caller-supplied options before canonicalization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawOptions {
	/// Requested dispatch mode; `None` selects the primitive's default.
	pub mode: Option<Mode>,
	/// Requested blocking discipline; `None` selects the primitive's default.
	pub blocking: Option<Blocking>,
	/// Requested reliability discipline; `None` selects the primitive's default.
	pub reliability: Option<Reliability>,
}

/// The canonical, validated option tuple used by the delivery engine.
///
/// Produced from [`RawOptions`] by [`OptionSet::canonicalize`]; entry points
/// never interpret `RawOptions` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
	/// Dispatch mode.
	pub mode: Mode,
	/// Blocking discipline.
	pub blocking: Blocking,
	/// Reliability discipline.
	pub reliability: Reliability,
}

impl OptionSet {
	/// Canonicalize raw options against a primitive's defaults, applying the
	/// MayDrop-as-NonBlock rule and rejecting invalid combinations.
	///
	/// Returns `Err(())` on a contradictory combination (e.g. DAT requesting
	/// `MayDrop`, which is never valid since DAT is always `NoDrop`); callers
	/// map that to `IocError::InvalidParam`.
	pub fn canonicalize(raw: RawOptions, default: OptionSet, dat_like: bool) -> Result<Self, ()> {
		let reliability = raw.reliability.unwrap_or(default.reliability);
		if dat_like && reliability == Reliability::MayDrop {
			return Err(());
		}
		let mode = raw.mode.unwrap_or(default.mode);
		let mut blocking = raw.blocking.unwrap_or(default.blocking);
		if reliability == Reliability::MayDrop && matches!(blocking, Blocking::MayBlock | Blocking::Timeout(_)) {
			blocking = Blocking::NonBlock;
		}
		Ok(Self { mode, blocking, reliability })
	}

	/// The default option set for EVT: Async + MayBlock + MayDrop.
	#[must_use]
	pub fn evt_default() -> Self {
		Self { mode: Mode::Async, blocking: Blocking::MayBlock, reliability: Reliability::MayDrop }
	}

	/// The default option set for CMD: Sync + MayBlock + NoDrop.
	#[must_use]
	pub fn cmd_default() -> Self {
		Self { mode: Mode::Sync, blocking: Blocking::MayBlock, reliability: Reliability::NoDrop }
	}

	/// The default option set for DAT: Async + MayBlock + NoDrop.
	#[must_use]
	pub fn dat_default() -> Self {
		Self { mode: Mode::Async, blocking: Blocking::MayBlock, reliability: Reliability::NoDrop }
	}
}

/// Process-wide capability and configuration report, returned by `getCapability`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capability {
	/// Configured depth of each EVT queue.
	pub depth_evt_desc_queue: usize,
	/// Configured depth of each DAT queue.
	pub depth_dat_chunk_queue: usize,
	/// Maximum accepted size, in bytes, of a single DAT chunk.
	pub max_data_queue_size: usize,
	/// Configured depth of the Conles bus queue.
	pub depth_conles_queue: usize,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn maydrop_full_block_downgrades_to_nonblock() {
		let raw = RawOptions {
			mode: None,
			blocking: Some(Blocking::MayBlock),
			reliability: Some(Reliability::MayDrop),
		};
		let opts = OptionSet::canonicalize(raw, OptionSet::evt_default(), false).unwrap();
		assert_eq!(opts.blocking, Blocking::NonBlock);
		assert_eq!(opts.reliability, Reliability::MayDrop);
	}

	#[test]
	fn dat_rejects_maydrop() {
		let raw = RawOptions { mode: None, blocking: None, reliability: Some(Reliability::MayDrop) };
		assert!(OptionSet::canonicalize(raw, OptionSet::dat_default(), true).is_err());
	}

	#[test]
	fn invalid_ids_report_as_invalid() {
		assert!(!SrvId::INVALID.is_valid());
		assert!(!LinkId::INVALID.is_valid());
		assert!(SrvId(1).is_valid());
	}
}
