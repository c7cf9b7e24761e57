//! Error type for the IOC public API.

use thiserror::Error;

/// Every error the public API can return.
#[derive(Debug, Error)]
pub enum IocError {
	/// A descriptor or option combination was invalid.
	#[error("invalid parameter: {0}")]
	InvalidParam(String),

	/// The given `SrvId` does not refer to a live service.
	#[error("service does not exist")]
	NotExistService,

	/// The given `LinkId` does not refer to a live link.
	#[error("link does not exist")]
	NotExistLink,

	/// `onlineService` was called with a URI already registered.
	#[error("service already exists")]
	ServiceAlreadyExist,

	/// `connectService`/`acceptClient` could not establish a link.
	#[error("connection failed: {0}")]
	ConnectionFailed(String),

	/// The operation exceeded its deadline.
	#[error("operation timed out")]
	Timeout,

	/// A link's declared usage is not a valid complement of the peer's.
	#[error("incompatible usage between link peers")]
	IncompatibleUsage,

	/// `postEVT` found no subscriber for the event id.
	#[error("no event consumer registered")]
	NoEventConsumer,

	/// `execCMD` found no registered executor for the link.
	#[error("no command executor registered")]
	NoCmdExecutor,

	/// The EVT descriptor queue could not accept more entries.
	#[error("too many queuing event descriptors")]
	TooManyQueuingEvtDesc,

	/// The Conles bus queue could not accept more entries for a subscriber.
	#[error("conles bus queue full")]
	FullQueuingEvtDesc,

	/// Sync-mode `postEVT` found the queue non-empty and could not wait.
	#[error("queue not empty within the allotted time")]
	TooLongEmptyingEvtDescQueue,

	/// The DAT queue is full and could not accept a new chunk.
	#[error("data chunk queue is full")]
	BufferFull,

	/// A DAT chunk exceeded the link's configured maximum size.
	#[error("data chunk exceeds the configured maximum size")]
	DataTooLarge,

	/// The link transitioned to Closing/Closed during the operation.
	#[error("link broken")]
	LinkBroken,

	/// `offlineService` was attempted while links remain and cannot be forced.
	#[error("service busy: links still attached")]
	ServiceBusy,

	/// The command or event id is not handled by the executor/consumer.
	#[error("operation not supported: {0}")]
	NotSupported(String),

	/// Failure to load or parse configuration.
	#[error("configuration error: {0}")]
	Config(#[from] crate::config::ConfigError),

	/// An internal invariant was violated.
	#[error("internal invariant violation: {0}")]
	Bug(String),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, IocError>;
