//! # Tags
//!
//! Tag syntax validation and tag reconciliation shared by accelerators and
//! cross-account attachments.

use crate::constants::{RESERVED_TAG_PREFIX, TAG_PATTERN};
use crate::controller::diff::{diff, Delta};
use crate::provider::{ApiError, GlobalAcceleratorApi, Tag};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

static TAG_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TAG_PATTERN).expect("Failed to compile tag regex - this should never happen")
});

/// A tag violates the allowed syntax
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid tag format in template")]
pub struct InvalidTag {
    pub key: String,
}

/// Check whether a single tag is acceptable
///
/// Keys must be non-empty and must not use the reserved `aws:` prefix; keys
/// and values may only contain letters, digits, whitespace and `_.:/=+-@`.
#[must_use]
pub fn is_valid_tag(tag: &Tag) -> bool {
    !tag.key.is_empty()
        && !tag.key.starts_with(RESERVED_TAG_PREFIX)
        && TAG_FORMAT.is_match(&tag.key)
        && TAG_FORMAT.is_match(&tag.value)
}

/// Validate every tag, reporting the first offender
///
/// # Errors
///
/// Returns [`InvalidTag`] naming the first tag that fails [`is_valid_tag`].
pub fn validate_tags(tags: Option<&[Tag]>) -> Result<(), InvalidTag> {
    match tags.unwrap_or_default().iter().find(|tag| !is_valid_tag(tag)) {
        Some(tag) => Err(InvalidTag {
            key: tag.key.clone(),
        }),
        None => Ok(()),
    }
}

/// Tag delta for one resource
///
/// Keys missing from `desired` are removed. Desired tags are added when their
/// key is new or their value differs from the observed one, since tagging an
/// existing key overwrites its value.
pub fn tag_delta(observed: Option<&[Tag]>, desired: Option<&[Tag]>) -> Delta<Tag> {
    Delta {
        to_add: diff(observed, desired, Tag::clone).to_add,
        to_remove: diff(observed, desired, |tag| tag.key.clone()).to_remove,
    }
}

/// Bring the tags on `arn` from `observed` to `desired`
///
/// Removes first, then adds. Skips either call when it has nothing to do.
///
/// # Errors
///
/// Propagates any failure of the untag or tag call.
pub async fn apply_tag_delta(
    api: &dyn GlobalAcceleratorApi,
    arn: &str,
    observed: Option<&[Tag]>,
    desired: Option<&[Tag]>,
) -> Result<Delta<Tag>, ApiError> {
    let delta = tag_delta(observed, desired);
    if delta.is_empty() {
        debug!(resource = arn, "Tags already up to date");
        return Ok(delta);
    }

    if !delta.to_remove.is_empty() {
        let keys: Vec<String> = delta.to_remove.iter().map(|t| t.key.clone()).collect();
        info!(resource = arn, keys = ?keys, "Removing tags");
        api.untag_resource(arn, &keys).await?;
    }
    if !delta.to_add.is_empty() {
        info!(resource = arn, count = delta.to_add.len(), "Adding tags");
        api.tag_resource(arn, &delta.to_add).await?;
    }

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_tags() {
        let tags = vec![
            Tag::new("Name", "edge accelerator"),
            Tag::new("team/owner", "net-ops@example.com"),
            Tag::new("cost-center", ""),
            Tag::new("Ünïcode", "日本語"),
        ];
        assert_eq!(validate_tags(Some(tags.as_slice())), Ok(()));
    }

    #[test]
    fn test_rejects_reserved_prefix() {
        let tags = vec![Tag::new("aws:cloudformation:stack-name", "x")];
        let err = validate_tags(Some(tags.as_slice())).expect_err("reserved prefix");
        assert_eq!(err.key, "aws:cloudformation:stack-name");
        assert_eq!(err.to_string(), "Invalid tag format in template");
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        assert!(!is_valid_tag(&Tag::new("bad*key", "v")));
        assert!(!is_valid_tag(&Tag::new("key", "bad#value")));
        assert!(!is_valid_tag(&Tag::new("", "v")));
    }

    #[test]
    fn test_absent_tags_are_valid() {
        assert_eq!(validate_tags(None), Ok(()));
    }

    #[test]
    fn test_tag_delta_sends_new_and_changed_values() {
        let observed = vec![
            Tag::new("same", "1"),
            Tag::new("changed", "1"),
            Tag::new("drop", "1"),
        ];
        let desired = vec![
            Tag::new("same", "1"),
            Tag::new("changed", "2"),
            Tag::new("new", "1"),
        ];
        let delta = tag_delta(Some(observed.as_slice()), Some(desired.as_slice()));
        assert_eq!(
            delta.to_add,
            vec![Tag::new("changed", "2"), Tag::new("new", "1")]
        );
        assert_eq!(delta.to_remove, vec![Tag::new("drop", "1")]);
    }

    #[test]
    fn test_value_change_does_not_untag_the_key() {
        let observed = vec![Tag::new("env", "dev")];
        let desired = vec![Tag::new("env", "prod")];
        let delta = tag_delta(Some(observed.as_slice()), Some(desired.as_slice()));
        assert_eq!(delta.to_add, vec![Tag::new("env", "prod")]);
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_unchanged_tags_produce_no_delta() {
        let tags = vec![Tag::new("env", "dev"), Tag::new("team", "edge")];
        assert!(tag_delta(Some(tags.as_slice()), Some(tags.as_slice())).is_empty());
    }
}
