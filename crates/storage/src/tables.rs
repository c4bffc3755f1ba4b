//! Table definitions for redb storage.

use redb::TableDefinition;

/// Table definitions for the code store.
pub struct Tables;

impl Tables {
    /// Access codes: code → serialized `AccessCode`
    ///
    /// Keys are the trimmed, validated code strings. Records are never
    /// removed.
    pub const ACCESS_CODES: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("access_codes");
}
