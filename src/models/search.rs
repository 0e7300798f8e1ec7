use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use super::Category;

/// One submitted search. Lives only until the worker has finished with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub recipients: Vec<String>,
    pub keywords: Vec<String>,
    pub category: Category,
}

/// Per-session state of the search form, kept in the session between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchContext {
    pub email: String,
    pub keywords: String,
    pub selected_option: Category,
    pub task_id: Option<String>,
    pub notice: Option<String>,
}

impl SearchContext {
    pub const SESSION_KEY: &'static str = "search_context";

    pub fn recipients(&self) -> Vec<String> {
        split_comma_list(&self.email)
    }

    pub fn manual_keywords(&self) -> Vec<String> {
        split_comma_list(&self.keywords)
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}

/// Splits a comma separated input, trimming entries and dropping empty ones.
pub fn split_comma_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Union of file and manual keywords without duplicates, first occurrence wins.
pub fn combine_keywords(file_keywords: Vec<String>, manual_keywords: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    file_keywords
        .into_iter()
        .chain(manual_keywords)
        .filter(|kw| seen.insert(kw.clone()))
        .collect()
}
