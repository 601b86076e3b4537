#![allow(clippy::new_without_default)]

//! Core of a GitHub notifications watcher: polls the notifications feed,
//! detects genuinely new threads by diffing against the previous poll,
//! triages them through user-defined rules, enriches threads with PR/issue
//! state, and groups the survivors for display. A sibling watcher applies
//! the same diff discipline to saved searches.

pub mod alerts;
pub mod config;
pub mod enrichment;
pub mod github;
pub mod group;
pub mod matcher;
pub mod reconcile;
pub mod rules;
pub mod search;

#[cfg(test)]
pub(crate) mod tests;
