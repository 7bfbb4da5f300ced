//! Operation stage identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::MongoxError;

/// The stage of a CRUD call a callback is attached to.
///
/// The two wildcard tags are registration targets only: a callback
/// registered under [`OperationType::BeforeAny`] runs for every concrete
/// `before…` dispatch, and one under [`OperationType::AfterAny`] for every
/// concrete `after…` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    /// Before a document insert.
    BeforeInsert,
    /// After a document insert.
    AfterInsert,
    /// Before an update.
    BeforeUpdate,
    /// After an update.
    AfterUpdate,
    /// Before a delete.
    BeforeDelete,
    /// After a delete.
    AfterDelete,
    /// Before an upsert.
    BeforeUpsert,
    /// After an upsert.
    AfterUpsert,
    /// Before a find.
    BeforeFind,
    /// After a find.
    AfterFind,
    /// Wildcard for every `before…` stage.
    BeforeAny,
    /// Wildcard for every `after…` stage.
    AfterAny,
}

impl OperationType {
    /// Every concrete (non-wildcard) stage.
    pub const CONCRETE: [OperationType; 10] = [
        Self::BeforeInsert,
        Self::AfterInsert,
        Self::BeforeUpdate,
        Self::AfterUpdate,
        Self::BeforeDelete,
        Self::AfterDelete,
        Self::BeforeUpsert,
        Self::AfterUpsert,
        Self::BeforeFind,
        Self::AfterFind,
    ];

    /// The tag as it is spelled in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeInsert => "beforeInsert",
            Self::AfterInsert => "afterInsert",
            Self::BeforeUpdate => "beforeUpdate",
            Self::AfterUpdate => "afterUpdate",
            Self::BeforeDelete => "beforeDelete",
            Self::AfterDelete => "afterDelete",
            Self::BeforeUpsert => "beforeUpsert",
            Self::AfterUpsert => "afterUpsert",
            Self::BeforeFind => "beforeFind",
            Self::AfterFind => "afterFind",
            Self::BeforeAny => "before*",
            Self::AfterAny => "after*",
        }
    }

    /// Check if this is one of the wildcard tags.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::BeforeAny | Self::AfterAny)
    }

    /// Check if this stage runs before the driver call.
    pub fn is_before(&self) -> bool {
        matches!(
            self,
            Self::BeforeInsert
                | Self::BeforeUpdate
                | Self::BeforeDelete
                | Self::BeforeUpsert
                | Self::BeforeFind
                | Self::BeforeAny
        )
    }

    /// Check if this stage runs after the driver call.
    pub fn is_after(&self) -> bool {
        !self.is_before()
    }

    /// The wildcard bucket consulted when dispatching this stage.
    ///
    /// Returns `None` for the wildcards themselves.
    pub fn wildcard(&self) -> Option<OperationType> {
        if self.is_wildcard() {
            None
        } else if self.is_before() {
            Some(Self::BeforeAny)
        } else {
            Some(Self::AfterAny)
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = MongoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CONCRETE
            .into_iter()
            .chain([Self::BeforeAny, Self::AfterAny])
            .find(|op| op.as_str() == s)
            .ok_or_else(|| MongoxError::invalid_argument(format!("unknown operation type: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(OperationType::BeforeInsert.is_before());
        assert!(OperationType::AfterFind.is_after());
        assert!(OperationType::BeforeAny.is_before());
        assert!(OperationType::AfterAny.is_after());
        assert!(!OperationType::BeforeUpsert.is_wildcard());
    }

    #[test]
    fn test_wildcard_mapping() {
        for op in OperationType::CONCRETE {
            let wildcard = op.wildcard().unwrap();
            assert!(wildcard.is_wildcard());
            assert_eq!(wildcard.is_before(), op.is_before());
        }
        assert_eq!(OperationType::BeforeAny.wildcard(), None);
        assert_eq!(OperationType::AfterAny.wildcard(), None);
    }

    #[test]
    fn test_parse_and_display() {
        for op in OperationType::CONCRETE {
            assert_eq!(op.to_string().parse::<OperationType>().unwrap(), op);
        }
        assert_eq!("before*".parse::<OperationType>().unwrap(), OperationType::BeforeAny);
        assert!("beforeNothing".parse::<OperationType>().is_err());
    }
}
