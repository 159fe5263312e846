use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use axum::http::Method;
use regex::Regex;
use tracing::{debug, warn};

use super::claims::{PermissionGrant, PermissionMap};
use super::error::AuthError;

const PATTERN_CACHE_LIMIT: usize = 1024;

type PatternCache = RwLock<HashMap<String, Option<Regex>>>;

fn pattern_cache() -> &'static PatternCache {
    static CACHE: OnceLock<PatternCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Compiled form of `pattern`, `None` when it does not compile.
///
/// Patterns are compiled on first use and kept in a bounded process-wide cache.
fn compiled(pattern: &str) -> Option<Regex> {
    let cache = pattern_cache();
    if let Some(hit) = cache.read().ok().and_then(|c| c.get(pattern).cloned()) {
        return hit;
    }

    let regex = match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Permission regex {:?} does not compile: {}", pattern, e);
            None
        }
    };

    if let Ok(mut cache) = cache.write() {
        if cache.len() >= PATTERN_CACHE_LIMIT {
            cache.clear();
        }
        cache.insert(pattern.to_string(), regex.clone());
    }
    regex
}

/// Allow the request when any granted permission's regex matches `path`.
///
/// A pattern that fails to compile grants nothing. The method is only
/// recorded, matching is path-based.
pub fn authorize<'a>(
    permissions: &'a PermissionMap,
    method: &Method,
    path: &str,
) -> Result<&'a PermissionGrant, AuthError> {
    for grant in permissions.values() {
        let Some(regex) = compiled(&grant.permission.regex) else {
            debug!("Skipping permission {} with invalid regex", grant.permission.name);
            continue;
        };
        if regex.is_match(path) {
            debug!(
                "{} {} allowed by permission {} via role {}",
                method, path, grant.permission.name, grant.role_name
            );
            return Ok(grant);
        }
    }

    warn!("{} {} denied: no matching permission", method, path);
    Err(AuthError::Forbidden)
}
