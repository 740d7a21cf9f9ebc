use mongodb::{Database, bson::doc};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::common::DatabaseError;

/// Send `ping` to the server and return the round trip time.
pub async fn ping(db: &Database) -> Result<Duration, DatabaseError> {
    let start = Instant::now();
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))?;

    let elapsed = start.elapsed();
    debug!(database = db.name(), latency_ms = elapsed.as_millis() as u64, "MongoDB ping");
    Ok(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_ping() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        assert!(ping(&client.database("test")).await.is_ok());
    }
}
