//! Analyst: a registered user who submits predictions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyst {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalyst {
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
}
