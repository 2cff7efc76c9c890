use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    /// Units on hand. Oversell is tolerated, so this may go negative.
    #[serde(default)]
    pub stock: i64,
}

impl Product {
    pub fn new(id: impl Into<String>, stock: i64) -> Self {
        Self {
            id: id.into(),
            stock,
        }
    }
}
