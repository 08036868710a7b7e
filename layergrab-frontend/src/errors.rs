use layergrab_engine::errors::ExtractError;
use layergrab_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("加载图纸失败: {0}")]
    Load(#[from] IoError),
    #[error("提取失败: {0}")]
    Extract(#[from] ExtractError),
    #[error("序列化输出失败: {0}")]
    Json(#[from] serde_json::Error),
}
