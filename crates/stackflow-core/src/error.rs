//! Stack construction error types

use thiserror::Error;

/// Errors raised while declaring or validating a stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("Invalid CIDR block '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("Subnet '{subnet}' block {cidr} is not contained in VPC '{vpc}' block {vpc_cidr}")]
    CidrNotContained {
        subnet: String,
        cidr: String,
        vpc: String,
        vpc_cidr: String,
    },

    #[error("Subnet '{subnet}' block {cidr} overlaps subnet '{other}' block {other_cidr}")]
    CidrOverlap {
        subnet: String,
        cidr: String,
        other: String,
        other_cidr: String,
    },

    #[error("Logical id already declared: {0}")]
    DuplicateLogicalId(String),

    #[error("'{from}' references undeclared resource '{to}'")]
    UnknownReference { from: String, to: String },

    #[error("'{from}' expects '{to}' to be a {expected}, found {found}")]
    ReferenceKindMismatch {
        from: String,
        to: String,
        expected: String,
        found: String,
    },

    #[error("Subnet '{0}' already has a default route")]
    DuplicateDefaultRoute(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StackError>;
