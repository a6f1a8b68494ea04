use redb::TableDefinition;

/// Document rows: id -> DocumentRecord (msgpack)
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Object key index: object key -> id of the document whose manifest holds it
pub const OBJECT_KEYS: TableDefinition<&str, &str> = TableDefinition::new("object_keys");

/// Owner index: submitting caller id -> msgpack Vec of document ids
pub const OWNER_DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_documents");
