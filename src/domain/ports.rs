use crate::domain::model::{ExtractedScore, TransposedScore};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    /// Must not leave a partial file behind when it fails.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> String;
    fn interval(&self) -> i32;
    fn document_suffixes(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractedScore>;
    async fn transform(&self, score: ExtractedScore) -> Result<TransposedScore>;
    async fn load(&self, score: TransposedScore) -> Result<String>;
}
