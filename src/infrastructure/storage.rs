use crate::services::storage::S3StorageService;
use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use std::env;
use std::sync::Arc;
use tracing::info;

/// Builds the S3 client from the environment.
///
/// `S3_ENDPOINT` switches to path-style addressing for S3-compatible
/// servers such as MinIO. Static keys are used when both
/// `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are set; otherwise the
/// default provider chain applies.
pub async fn setup_storage() -> anyhow::Result<Arc<S3StorageService>> {
    let bucket = env::var("S3_BUCKET").context("S3_BUCKET must be set")?;
    let region = env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-2".to_string());
    let endpoint_url = env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty());

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));

    if let (Ok(access_key), Ok(secret_key)) = (
        env::var("AWS_ACCESS_KEY_ID"),
        env::var("AWS_SECRET_ACCESS_KEY"),
    ) {
        loader = loader.credentials_provider(Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }

    if let Some(endpoint) = &endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    info!(
        "☁️  S3 Storage: {} (Bucket: {}, Region: {})",
        endpoint_url.as_deref().unwrap_or("aws"),
        bucket,
        region
    );

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Ok(Arc::new(S3StorageService::new(s3_client, bucket)))
}
