use thiserror::Error;

/// Reasons a peer address is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JidError {
    #[error("Address is empty")]
    Empty,

    #[error("Address has no '@' separating local part and domain")]
    MissingAt,

    #[error("Address has more than one '@' in its bare part")]
    TooManyAt,

    #[error("Local part is empty")]
    EmptyLocal,

    #[error("Domain part is empty")]
    EmptyDomain,

    #[error("Resource is empty after '/'")]
    EmptyResource,

    #[error("Invalid character {0:?} in address")]
    InvalidChar(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown presence show value: {0:?}")]
pub struct ShowParseError(pub String);
