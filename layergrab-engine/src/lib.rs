pub mod cluster;
pub mod extract;
pub mod host;
pub mod naming;
pub mod points;
pub mod representative;
pub mod resolver;
pub mod retry;

pub use extract::{Extraction, Extractor, OutputPoint, RunConfig};
pub use host::HostDocument;
pub use representative::{CornerTag, PointMode};
pub use resolver::ResolverCache;
pub use retry::{RetryPolicy, invoke_with_retry};

pub mod errors {
    use thiserror::Error;

    /// 宿主文档接口返回的错误。仅 `Busy` 视为可重试。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum HostError {
        #[error("host application is busy")]
        Busy,
        #[error("host document is unavailable: {0}")]
        Unavailable(String),
        #[error("host rejected the call: {0}")]
        Rejected(String),
    }

    impl HostError {
        #[inline]
        pub fn is_retryable(&self) -> bool {
            matches!(self, HostError::Busy)
        }
    }

    #[derive(Debug, Error)]
    pub enum RetryError<E: std::error::Error + 'static> {
        #[error("call still failing after {attempts} attempts: {last}")]
        Exhausted {
            attempts: u32,
            #[source]
            last: E,
        },
        #[error("call failed: {0}")]
        Fatal(#[source] E),
    }

    /// 整次提取失败，不返回任何部分结果。
    #[derive(Debug, Error)]
    pub enum ExtractError {
        #[error("no target layers were requested")]
        NoTargetLayers,
        #[error("decimal precision {0} is out of range (0..=12)")]
        InvalidPrecision(u32),
        #[error("start number {start} cannot number {count} points without overflow")]
        StartNumberOverflow { start: u64, count: usize },
        #[error("document is unavailable: {0}")]
        DocumentUnavailable(#[source] RetryError<HostError>),
        #[error("failed to enumerate layers: {0}")]
        LayerEnumerationFailure(#[source] RetryError<HostError>),
    }

    /// 非致命问题：随结果一起返回，提取继续进行。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum Warning {
        #[error("block definition `{0}` not found")]
        DefinitionNotFound(String),
        #[error("layout block `{0}` skipped")]
        LayoutDefinitionSkipped(String),
        #[error("cyclic reference to block `{0}` cut off")]
        CyclicDefinitionReference(String),
        #[error("{kind} on layer `{layer}` in {container} is unreadable: {reason}")]
        PrimitiveReadFailure {
            container: String,
            kind: String,
            layer: String,
            reason: String,
        },
        #[error("host call for block `{definition}` failed: {message}")]
        HostCallFailed { definition: String, message: String },
    }
}
