use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct Category {
    #[oas("format:int64,minimum:1")]
    pub id: i64,
    #[oas("description:'Category name',maxLength:64")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Available,
    Pending,
    Sold,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: i64,
    #[oas("#The pet's name")]
    pub name: String,
    #[oas("$ref:Category")]
    pub category: Option<Category>,
    pub photo_urls: Vec<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    #[oas = "x-internal:true"]
    pub labels: HashMap<String, String>,
    #[serde(skip)]
    pub owner_token: String,
}

/// Linked list node; only describable through `$ref`
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    pub value: i32,
    pub next: Option<Box<Node>>,
}
