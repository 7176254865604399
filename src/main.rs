use otelstore::app;
use otelstore::error::IngestError;

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    app::run().await
}
