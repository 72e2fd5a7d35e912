//! Code generation and lookup.
//!
//! # Usage
//!
//! ```bash
//! # Print 50 fresh codes for a bracelet print run
//! qrtag-cli codes generate --count 50
//!
//! # Check whether a code has been claimed
//! qrtag-cli codes status ab12cd34
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use qrtag_core::{ClaimStatus, Code};
use qrtag_server::db::{PgProfileStore, create_pool};
use qrtag_server::services::ClaimLedger;

use super::{CommandError, database_url};

/// Upper bound on a single batch.
pub const MAX_BATCH: usize = 10_000;

/// Generate `count` codes, distinct within the batch.
///
/// Codes are not checked against the database; a printed code only becomes
/// taken once it is claimed.
///
/// # Errors
///
/// Returns `InvalidArgument` if `count` is zero or above [`MAX_BATCH`].
pub fn generate(count: usize) -> Result<Vec<Code>, CommandError> {
    if count == 0 || count > MAX_BATCH {
        return Err(CommandError::InvalidArgument(format!(
            "count must be between 1 and {MAX_BATCH}"
        )));
    }

    let mut seen = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);
    while codes.len() < count {
        let code = Code::generate();
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    Ok(codes)
}

/// Look up the claim status of a code.
///
/// # Errors
///
/// Returns an error if the code is malformed or the database is unreachable.
pub async fn status(raw: &str) -> Result<ClaimStatus, CommandError> {
    let code = Code::parse(raw).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let pool = create_pool(&database_url()?).await?;
    let ledger = ClaimLedger::new(Arc::new(PgProfileStore::new(pool)));

    ledger.check_status(&code).await.map_err(|e| match e {
        qrtag_server::services::ClaimError::Repository(inner) => CommandError::Repository(inner),
        other => CommandError::InvalidArgument(other.to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_batch_is_distinct() {
        let codes = generate(500).unwrap();
        assert_eq!(codes.len(), 500);
        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), 500);
    }

    #[test]
    fn test_generate_codes_are_valid() {
        for code in generate(20).unwrap() {
            assert_eq!(code.as_str().len(), Code::GENERATED_LENGTH);
            assert!(Code::parse(code.as_str()).is_ok());
        }
    }

    #[test]
    fn test_generate_rejects_bad_counts() {
        assert!(matches!(generate(0), Err(CommandError::InvalidArgument(_))));
        assert!(matches!(
            generate(MAX_BATCH + 1),
            Err(CommandError::InvalidArgument(_))
        ));
    }
}
