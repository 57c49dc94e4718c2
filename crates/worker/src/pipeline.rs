//! Single-document conversion: metadata lookup, convert, merge, persist.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::conversion::{merge_metadata, ConversionOutcome};
use docflow_core::error::CoreError;
use docflow_core::job::Document;

use crate::converter::ConvertError;
use crate::error::WorkerError;
use crate::persist::OutputWriter;
use crate::pool::WorkerPoolState;

/// Turns one document into one outcome.
///
/// `Ok` carries the outcome whether conversion succeeded or not; `Err` is
/// reserved for infrastructure failures that must abort the whole job.
#[async_trait]
pub trait ProcessDocument: Send + Sync {
    async fn process(&self, document: &Document) -> Result<ConversionOutcome, WorkerError>;
}

pub struct DocumentPipeline {
    state: Arc<WorkerPoolState>,
    output: Option<Arc<OutputWriter>>,
    convert_timeout: Duration,
}

impl DocumentPipeline {
    pub fn new(
        state: Arc<WorkerPoolState>,
        output: Option<Arc<OutputWriter>>,
        convert_timeout: Duration,
    ) -> Self {
        Self {
            state,
            output,
            convert_timeout,
        }
    }
}

#[async_trait]
impl ProcessDocument for DocumentPipeline {
    async fn process(&self, document: &Document) -> Result<ConversionOutcome, WorkerError> {
        let filename = document.filename.as_str();
        let external = self.state.metadata_for(filename);

        let converted = match tokio::time::timeout(
            self.convert_timeout,
            self.state
                .converter
                .convert(filename, &document.content, &external),
        )
        .await
        {
            Ok(Ok(converted)) => converted,
            Ok(Err(ConvertError::Transport(reason))) => {
                tracing::error!(file = filename, error = %reason, "Converter unreachable");
                return Err(WorkerError::ConverterUnavailable(reason));
            }
            Ok(Err(e)) => {
                tracing::error!(file = filename, error = %e, "Conversion failed");
                return Ok(ConversionOutcome::error(filename, e.to_string()));
            }
            Err(_) => {
                let e = ConvertError::Timeout(self.convert_timeout);
                tracing::error!(file = filename, error = %e, "Conversion failed");
                return Ok(ConversionOutcome::error(filename, e.to_string()));
            }
        };

        let metadata = merge_metadata(converted.metadata.clone(), &external);

        if let Some(output) = &self.output {
            match output.write(filename, &converted, &metadata).await {
                Ok(_) => {}
                Err(WorkerError::Core(CoreError::Validation(reason))) => {
                    tracing::error!(file = filename, error = %reason, "Output name rejected");
                    return Ok(ConversionOutcome::error(filename, reason));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            file = filename,
            text_len = converted.text.len(),
            images = converted.images.len(),
            "Document converted",
        );
        Ok(ConversionOutcome::ok(
            filename,
            converted.text,
            &converted.images,
            metadata,
        ))
    }
}
