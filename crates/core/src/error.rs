//! Pipeline failure taxonomy.
//!
//! Every failure is caught at (source, date) granularity by the
//! orchestrator; the variants exist so alerts and logs can say which stage
//! gave out, not to drive in-run retries. Transient fetch and decode
//! failures are retried on the next scheduled run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The object was missing or the transfer failed. Retryable at the next
    /// scheduled run; the date is skipped for this one.
    #[error("fetch failed for {key}: {reason}")]
    TransientFetch { key: String, reason: String },

    /// The partition downloaded but its contents could not be decoded.
    #[error("decode failed for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// The cache table's stored column set no longer matches the expected
    /// schema and the rewrite fallback also failed.
    #[error("schema drift on {table}: expected [{expected}], stored [{stored}]")]
    SchemaDrift {
        table: String,
        expected: String,
        stored: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn fetch(key: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::TransientFetch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(key: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::Decode {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema_drift(table: impl Into<String>, expected: &[&str], stored: &[String]) -> Self {
        PipelineError::SchemaDrift {
            table: table.into(),
            expected: expected.join(", "),
            stored: stored.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_names_the_key() {
        let err = PipelineError::fetch("funding/20240510.csv.lz4", "404 Not Found");
        assert_eq!(
            err.to_string(),
            "fetch failed for funding/20240510.csv.lz4: 404 Not Found"
        );
    }

    #[test]
    fn schema_drift_lists_both_column_sets() {
        let err = PipelineError::schema_drift(
            "funding_cache",
            &["time", "coin"],
            &["time".to_string(), "coin".to_string(), "extra".to_string()],
        );
        let msg = err.to_string();
        assert!(msg.contains("funding_cache"));
        assert!(msg.contains("extra"));
    }
}
