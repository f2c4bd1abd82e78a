pub mod broadcast;
pub mod config;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod item;
pub mod logging;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod transform;
pub mod worker;

pub use broadcast::{BatchEvent, BatchEventKind, BatchProgressBroadcaster};
pub use config::{load_config, AspectRatio, BatchConfig, ProcessingMode, ServiceConfig};
pub use delivery::{assemble_archive, DeliveryMode, StudioArchive};
pub use error::{
    ConfigError, DeliveryError, IngestError, Result, RunError, StudioError, TransformError,
};
pub use ingest::{IngestSource, ListedFile, SourceKind};
pub use item::{Item, ItemStatus, ResultImage, SourceImage};
pub use logging::{init_tracing, LogFormat};
pub use pipeline::{
    AppStatus, BatchController, BatchSummary, CredentialSelector, Notice, NoticeKind, RunSummary,
};
pub use secrets::{resolve_secret, SecretError};
pub use transform::{LocalResize, RemoteTransform, RetryPolicy, Transform};
pub use worker::WorkerPool;
