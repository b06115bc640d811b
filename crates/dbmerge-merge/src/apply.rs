use tracing::{info, warn};

use crate::context::MergerContext;
use crate::token::{MergerToken, MergerTokenFactory};

/// How [`apply_tokens`] reacts to a failing token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyPolicy {
    /// Stop after the first token that records an error.
    pub stop_on_failure: bool,
}

/// Execute tokens strictly in order. Returns how many tokens ran; failures
/// are collected in the context's validation report.
pub fn apply_tokens(tokens: &[MergerToken], ctx: &mut MergerContext, policy: ApplyPolicy) -> usize {
    let mut applied = 0;
    for token in tokens {
        let errors_before = ctx.validation.errors.len();
        token.execute(ctx);
        applied += 1;
        let failed = ctx.validation.errors.len() > errors_before;
        info!(token = %token, failed, "token applied");
        if failed && policy.stop_on_failure {
            warn!(applied, remaining = tokens.len() - applied, "stopping after failed token");
            break;
        }
    }
    applied
}

/// Reverse every token, turning a database-bound list into the matching
/// model-bound list and back.
pub fn reverse_tokens(tokens: &[MergerToken], factory: &dyn MergerTokenFactory) -> Vec<MergerToken> {
    tokens
        .iter()
        .map(|token| token.create_reverse(factory))
        .collect()
}
