//! # Resource Identifiers
//!
//! Parsing for Global Accelerator ARNs.
//!
//! Child identifiers embed their parent as a strict prefix:
//!
//! ```text
//! arn:aws:globalaccelerator::123456789012:accelerator/<uuid>
//! arn:aws:globalaccelerator::123456789012:accelerator/<uuid>/listener/<id>
//! arn:aws:globalaccelerator::123456789012:accelerator/<uuid>/listener/<id>/endpoint-group/<id>
//! ```
//!
//! so the owner of any child is found by parsing, without a lookup call.

use crate::constants::SERVICE_NAME;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static ACCELERATOR_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:(\w+)::(\d{12}):(\w+)/([0-9a-f-]+)$")
        .expect("Failed to compile accelerator ARN regex - this should never happen")
});

static CHILD_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)/(listener|endpoint-group)/(\w+)$")
        .expect("Failed to compile child ARN regex - this should never happen")
});

/// Identifier parsing failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("'{arn}' is not a valid {expected} ARN")]
    Malformed { arn: String, expected: &'static str },

    #[error("'{arn}' belongs to service '{service}', expected 'globalaccelerator'")]
    WrongService { arn: String, service: String },

    #[error("'{arn}' names a '{found}' resource, expected '{expected}'")]
    WrongResourceType {
        arn: String,
        found: String,
        expected: &'static str,
    },
}

/// `arn:aws:globalaccelerator::<account>:accelerator/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcceleratorArn {
    pub account_id: String,
    pub accelerator_id: String,
}

impl FromStr for AcceleratorArn {
    type Err = ArnError;

    fn from_str(arn: &str) -> Result<Self, Self::Err> {
        let captures = ACCELERATOR_ARN.captures(arn).ok_or_else(|| ArnError::Malformed {
            arn: arn.to_string(),
            expected: "accelerator",
        })?;

        let service = &captures[1];
        if service != SERVICE_NAME {
            return Err(ArnError::WrongService {
                arn: arn.to_string(),
                service: service.to_string(),
            });
        }
        let resource = &captures[3];
        if resource != "accelerator" {
            return Err(ArnError::WrongResourceType {
                arn: arn.to_string(),
                found: resource.to_string(),
                expected: "accelerator",
            });
        }

        Ok(Self {
            account_id: captures[2].to_string(),
            accelerator_id: captures[4].to_string(),
        })
    }
}

impl fmt::Display for AcceleratorArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:aws:{SERVICE_NAME}::{}:accelerator/{}",
            self.account_id, self.accelerator_id
        )
    }
}

/// `<accelerator arn>/listener/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerArn {
    pub accelerator: AcceleratorArn,
    pub listener_id: String,
}

impl FromStr for ListenerArn {
    type Err = ArnError;

    fn from_str(arn: &str) -> Result<Self, Self::Err> {
        let (parent, listener_id) = split_child(arn, "listener")?;
        Ok(Self {
            accelerator: parent.parse()?,
            listener_id,
        })
    }
}

impl fmt::Display for ListenerArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/listener/{}", self.accelerator, self.listener_id)
    }
}

/// `<listener arn>/endpoint-group/<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointGroupArn {
    pub listener: ListenerArn,
    pub endpoint_group_id: String,
}

impl EndpointGroupArn {
    #[must_use]
    pub fn accelerator(&self) -> &AcceleratorArn {
        &self.listener.accelerator
    }
}

impl FromStr for EndpointGroupArn {
    type Err = ArnError;

    fn from_str(arn: &str) -> Result<Self, Self::Err> {
        let (parent, endpoint_group_id) = split_child(arn, "endpoint-group")?;
        Ok(Self {
            listener: parent.parse()?,
            endpoint_group_id,
        })
    }
}

impl fmt::Display for EndpointGroupArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/endpoint-group/{}",
            self.listener, self.endpoint_group_id
        )
    }
}

fn split_child<'a>(arn: &'a str, segment: &'static str) -> Result<(&'a str, String), ArnError> {
    let malformed = || ArnError::Malformed {
        arn: arn.to_string(),
        expected: segment,
    };
    let captures = CHILD_ARN.captures(arn).ok_or_else(malformed)?;
    if &captures[2] != segment {
        return Err(malformed());
    }
    let parent = captures.get(1).ok_or_else(malformed)?.as_str();
    Ok((parent, captures[3].to_string()))
}

/// Identifier of the direct parent of a listener or endpoint group
///
/// # Errors
///
/// Returns [`ArnError`] when `child` is not a well-formed listener or
/// endpoint group ARN.
pub fn parent_of(child: &str) -> Result<String, ArnError> {
    if let Ok(group) = child.parse::<EndpointGroupArn>() {
        return Ok(group.listener.to_string());
    }
    let listener = child.parse::<ListenerArn>().map_err(|_| ArnError::Malformed {
        arn: child.to_string(),
        expected: "listener or endpoint-group",
    })?;
    Ok(listener.accelerator.to_string())
}

/// Identifier of the accelerator that ultimately owns `arn`
///
/// Accepts accelerator, listener, and endpoint group ARNs.
///
/// # Errors
///
/// Returns [`ArnError`] when `arn` matches none of the three shapes.
pub fn owning_accelerator(arn: &str) -> Result<AcceleratorArn, ArnError> {
    if let Ok(accelerator) = arn.parse::<AcceleratorArn>() {
        return Ok(accelerator);
    }
    let mut current = parent_of(arn)?;
    loop {
        match current.parse::<AcceleratorArn>() {
            Ok(accelerator) => return Ok(accelerator),
            Err(_) => current = parent_of(&current)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCELERATOR: &str =
        "arn:aws:globalaccelerator::123456789012:accelerator/1234abcd-abcd-1234-abcd-1234abcdefgh";
    const ACCELERATOR_OK: &str =
        "arn:aws:globalaccelerator::123456789012:accelerator/1234abcd-abcd-1234-abcd-1234abcdef00";

    #[test]
    fn test_accelerator_round_trip() {
        let parsed: AcceleratorArn = ACCELERATOR_OK.parse().expect("valid accelerator arn");
        assert_eq!(parsed.account_id, "123456789012");
        assert_eq!(parsed.to_string(), ACCELERATOR_OK);
    }

    #[test]
    fn test_accelerator_rejects_non_hex_id() {
        assert!(ACCELERATOR.parse::<AcceleratorArn>().is_err());
    }

    #[test]
    fn test_accelerator_rejects_wrong_service() {
        let err = "arn:aws:ec2::123456789012:accelerator/abcd"
            .parse::<AcceleratorArn>()
            .expect_err("wrong service");
        assert!(matches!(err, ArnError::WrongService { .. }));
    }

    #[test]
    fn test_accelerator_rejects_wrong_resource() {
        let err = "arn:aws:globalaccelerator::123456789012:attachment/abcd"
            .parse::<AcceleratorArn>()
            .expect_err("wrong resource type");
        assert!(matches!(err, ArnError::WrongResourceType { .. }));
    }

    #[test]
    fn test_parent_of_listener_is_accelerator() {
        let listener = format!("{ACCELERATOR_OK}/listener/0123abcd");
        assert_eq!(parent_of(&listener).expect("parent"), ACCELERATOR_OK);
    }

    #[test]
    fn test_parent_of_endpoint_group_is_listener() {
        let listener = format!("{ACCELERATOR_OK}/listener/0123abcd");
        let group = format!("{listener}/endpoint-group/ab12cd34");
        assert_eq!(parent_of(&group).expect("parent"), listener);

        let parsed: EndpointGroupArn = group.parse().expect("valid endpoint group arn");
        assert_eq!(parsed.accelerator().to_string(), ACCELERATOR_OK);
        assert_eq!(parsed.to_string(), group);
    }

    #[test]
    fn test_owning_accelerator_walks_to_root() {
        let group = format!("{ACCELERATOR_OK}/listener/0123abcd/endpoint-group/ab12cd34");
        assert_eq!(
            owning_accelerator(&group).expect("owner").to_string(),
            ACCELERATOR_OK
        );
        assert_eq!(
            owning_accelerator(ACCELERATOR_OK).expect("owner").to_string(),
            ACCELERATOR_OK
        );
    }

    #[test]
    fn test_parent_of_accelerator_is_an_error() {
        assert!(parent_of(ACCELERATOR_OK).is_err());
        assert!(parent_of("not-an-arn").is_err());
    }
}
