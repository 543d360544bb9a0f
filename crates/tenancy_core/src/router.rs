//! Request path dispatch to document type render hooks.
//!
//! The leading path segment selects a registered type by slug; the rest of
//! the path goes to that type's `render` hook.

use crate::context::Environment;
use log::debug;

/// Dispatch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Rendered { slug: String, body: String },
    NotFound { path: String },
}

/// Splits `path` into its leading segment and the remainder.
///
/// Leading slashes are ignored: `/pages/a/b` -> (`pages`, `a/b`).
pub fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_start_matches('/');
    trimmed.split_once('/').unwrap_or((trimmed, ""))
}

/// Routes `path` to the matching type's render hook.
pub fn dispatch(env: &Environment, path: &str) -> RouteOutcome {
    let (slug, rest) = split_path(path);
    let rendered = env
        .document_type(slug)
        .and_then(|doc_type| doc_type.render(env, rest));

    match rendered {
        Some(body) => {
            debug!("event=route module=router status=ok slug={slug}");
            RouteOutcome::Rendered {
                slug: slug.to_string(),
                body,
            }
        }
        None => {
            debug!("event=route module=router status=not_found path={path}");
            RouteOutcome::NotFound {
                path: path.to_string(),
            }
        }
    }
}
