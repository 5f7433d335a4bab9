//! Core types: attribute identifiers, index definitions, and layout constants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical table name the records live in.
pub const TABLE_NAME: &str = "TasklyTodoItems";

/// Constant value stored on every record so the creation-time index holds
/// the whole collection in a single partition.
pub const PARTITION_TAG: &str = "TODOS";

/// Page size used when a caller asks for zero or a negative number of items.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound applied to caller-supplied page sizes.
pub const MAX_PAGE_SIZE: usize = 100;

/// A stored attribute of a record.
///
/// The wire names returned by [`Field::attribute_name`] are only serialization
/// labels; everything inside the crate refers to attributes through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Id,
    Title,
    Description,
    DueDate,
    Status,
    CreatedAt,
    UpdatedAt,
    PartitionTag,
}

impl Field {
    pub const fn attribute_name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Description => "description",
            Field::DueDate => "dueDate",
            Field::Status => "status",
            Field::CreatedAt => "createdAt",
            Field::UpdatedAt => "updatedAt",
            Field::PartitionTag => "sortKey",
        }
    }

    pub const ALL: [Field; 8] = [
        Field::Id,
        Field::Title,
        Field::Description,
        Field::DueDate,
        Field::Status,
        Field::CreatedAt,
        Field::UpdatedAt,
        Field::PartitionTag,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// The primary key attribute of the table.
pub const TABLE_KEY: Field = Field::Id;

/// Secondary indexes maintained over the record table.
///
/// Every index is ordered by creation time within a partition, with the
/// record id as a tiebreaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexName {
    CreatedAt,
    Status,
    DueDate,
}

impl IndexName {
    pub const ALL: [IndexName; 3] = [IndexName::CreatedAt, IndexName::Status, IndexName::DueDate];

    pub const fn as_str(self) -> &'static str {
        match self {
            IndexName::CreatedAt => "CreatedAtIndex",
            IndexName::Status => "StatusIndex",
            IndexName::DueDate => "DueDateIndex",
        }
    }

    /// Attribute whose value selects the index partition.
    pub const fn partition_key(self) -> Field {
        match self {
            IndexName::CreatedAt => Field::PartitionTag,
            IndexName::Status => Field::Status,
            IndexName::DueDate => Field::DueDate,
        }
    }

    /// Attribute the index is ordered by within a partition.
    pub const fn sort_key(self) -> Field {
        Field::CreatedAt
    }

    /// Attributes making up a continuation key for this index, in the order
    /// the store emits them: table key first, then the index keys.
    pub const fn cursor_fields(self) -> [Field; 3] {
        [TABLE_KEY, self.partition_key(), self.sort_key()]
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
