/// Database row types. These map directly to SQLite rows.
/// Distinct from train-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub likes: u32,
    pub dislikes: u32,
    pub created_at: String,
}
