//! Capability matching and glob rules.
//!
//! One glob algorithm serves allow/deny identity rules and capability scopes:
//! `*` matches any run of characters (separators included), every other
//! character is literal, and the comparison is exact and case-sensitive.
//! Identity rules are canonicalized before they reach this module.
//!
//! A required scope of `*` means the concrete scope is only known at call
//! time. It is covered by any grant that holds at least one scope for the
//! resource and verbs; the tool checks the concrete value itself through
//! [`host_tools::Runtime::granted`].

use host_primitives::{ANY_SCOPE, Capability, EXECUTE_RESOURCE, EXECUTE_VERB};

/// Returns `true` when `candidate` matches the glob `pattern`.
#[must_use]
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.as_bytes();
    let candidate = candidate.as_bytes();

    let (mut p, mut c) = (0, 0);
    // Position of the last `*` seen and the candidate offset it was tried at.
    let mut star: Option<(usize, usize)> = None;

    while c < candidate.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, c));
            p += 1;
        } else if p < pattern.len() && pattern[p] == candidate[c] {
            p += 1;
            c += 1;
        } else if let Some((star_p, star_c)) = star {
            p = star_p + 1;
            c = star_c + 1;
            star = Some((star_p, star_c + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&b| b == b'*')
}

/// Matches an allow/deny rule against a canonical tool identity.
#[must_use]
pub fn match_rule(pattern: &str, identity: &str) -> bool {
    glob_match(pattern, identity)
}

/// Returns `true` when `rule` matches the synthetic execute capability.
///
/// Capabilities for any other resource or verb never match a name rule.
#[must_use]
pub fn rule_matches_execute(rule: &str, capability: &Capability) -> bool {
    capability.resource().eq_ignore_ascii_case(EXECUTE_RESOURCE)
        && capability
            .verbs()
            .iter()
            .any(|verb| verb.eq_ignore_ascii_case(EXECUTE_VERB))
        && capability
            .scopes()
            .iter()
            .any(|identity| match_rule(rule, identity))
}

/// Returns `true` when one grant covers `required` on its own.
///
/// Resource and verbs compare case-insensitively; every required scope must
/// match at least one of the grant's scope patterns. A required `*` is
/// covered by any non-empty grant scope set.
#[must_use]
pub fn grant_covers(grant: &Capability, required: &Capability) -> bool {
    if !grant.resource().eq_ignore_ascii_case(required.resource()) {
        return false;
    }

    let verbs_held = required.verbs().iter().all(|verb| {
        grant
            .verbs()
            .iter()
            .any(|held| held.eq_ignore_ascii_case(verb))
    });
    if !verbs_held {
        return false;
    }

    required.scopes().iter().all(|scope| {
        if scope == ANY_SCOPE {
            return !grant.scopes().is_empty();
        }
        grant
            .scopes()
            .iter()
            .any(|pattern| glob_match(pattern, scope))
    })
}

/// Returns `true` when some grant covers `required`.
#[must_use]
pub fn check(required: &Capability, grants: &[Capability]) -> bool {
    grants.iter().any(|grant| grant_covers(grant, required))
}
