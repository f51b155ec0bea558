pub mod time;

/// Generates a globally unique id, used for sessions and runs.
pub fn longid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generates a short id, used for nodes and edges minted by paste or duplicate.
pub fn shortid() -> String {
    nanoid::nanoid!(10)
}
