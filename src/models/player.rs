use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub tag: String,
}

impl Player {
    pub fn new(id: String, name: String, tag: String) -> Self {
        Self { id, name, tag }
    }
}
