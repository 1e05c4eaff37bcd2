use std::io::Write;
use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::error::{Result, XferError};
use crate::store::ObjectStore;

/// S3 client driven through a private current-thread runtime.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    runtime: Runtime,
}

fn backend_err(op: &str, bucket: &str, key: &str, e: impl std::error::Error) -> XferError {
    XferError::Backend(format!(
        "s3 {op} s3://{bucket}/{key}: {}",
        DisplayErrorContext(e)
    ))
}

impl S3ObjectStore {
    /// Credentials and region come from the default provider chain.
    pub fn from_env() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let config =
            runtime.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
        Ok(Self {
            client: aws_sdk_s3::Client::new(&config),
            runtime,
        })
    }

    pub fn with_client(client: aws_sdk_s3::Client, runtime: Runtime) -> Self {
        Self { client, runtime }
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str, dst: &mut dyn Write) -> Result<u64> {
        self.runtime.block_on(async {
            let out = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| backend_err("get", bucket, key, e))?;
            let mut body = out.body;
            let mut written = 0u64;
            while let Some(bytes) = body
                .try_next()
                .await
                .map_err(|e| backend_err("read", bucket, key, e))?
            {
                dst.write_all(&bytes)?;
                written += bytes.len() as u64;
            }
            debug!(bucket, key, bytes = written, "s3 object downloaded");
            Ok::<_, XferError>(written)
        })
    }

    fn put_object(&self, bucket: &str, key: &str, src: &Path) -> Result<u64> {
        let len = std::fs::metadata(src)?.len();
        self.runtime.block_on(async {
            let body = ByteStream::from_path(src)
                .await
                .map_err(|e| backend_err("read local", bucket, key, e))?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| backend_err("put", bucket, key, e))?;
            Ok::<_, XferError>(len)
        })
    }

    fn content_length(&self, bucket: &str, key: &str) -> Result<u64> {
        self.runtime.block_on(async {
            match self.client.head_object().bucket(bucket).key(key).send().await {
                Ok(out) => Ok(out.content_length().unwrap_or_default().max(0) as u64),
                Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                    Err(XferError::MissingRecord {
                        id: format!("{bucket}/{key}"),
                    })
                }
                Err(e) => Err(backend_err("head", bucket, key, e)),
            }
        })
    }
}
