#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feedwatch_core::{Comment, Post};
use feedwatch_graph::{GraphApi, GraphError, Page};
use feedwatch_sync::MirrorSettings;

type Scripted<T> = VecDeque<Result<Page<T>, GraphError>>;

/// A [`GraphApi`] that replays queued responses per source or post and
/// records every call. An exhausted queue answers with an empty last page.
#[derive(Default)]
pub struct ScriptedGraph {
    feeds: Mutex<HashMap<String, Scripted<Post>>>,
    comments: Mutex<HashMap<String, Scripted<Comment>>>,
    feed_calls: Mutex<Vec<String>>,
    comment_calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_feed(&self, source_id: &str, response: Result<Page<Post>, GraphError>) {
        self.feeds
            .lock()
            .unwrap()
            .entry(source_id.to_owned())
            .or_default()
            .push_back(response);
    }

    pub fn push_comments(&self, post_id: &str, response: Result<Page<Comment>, GraphError>) {
        self.comments
            .lock()
            .unwrap()
            .entry(post_id.to_owned())
            .or_default()
            .push_back(response);
    }

    pub fn feed_calls(&self) -> Vec<String> {
        self.feed_calls.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<(String, Option<String>)> {
        self.comment_calls.lock().unwrap().clone()
    }

    pub fn comment_calls_for(&self, post_id: &str) -> Vec<Option<String>> {
        self.comment_calls()
            .into_iter()
            .filter(|(id, _)| id == post_id)
            .map(|(_, after)| after)
            .collect()
    }
}

#[async_trait]
impl GraphApi for ScriptedGraph {
    async fn fetch_feed(&self, source_id: &str, _limit: u32) -> Result<Page<Post>, GraphError> {
        self.feed_calls.lock().unwrap().push(source_id.to_owned());
        let next = self
            .feeds
            .lock()
            .unwrap()
            .get_mut(source_id)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Ok(page(vec![], None)))
    }

    async fn fetch_comments(
        &self,
        post_id: &str,
        _limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Comment>, GraphError> {
        self.comment_calls
            .lock()
            .unwrap()
            .push((post_id.to_owned(), after.map(str::to_owned)));
        let next = self
            .comments
            .lock()
            .unwrap()
            .get_mut(post_id)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| Ok(page(vec![], None)))
    }
}

pub fn page<T>(items: Vec<T>, next_cursor: Option<&str>) -> Page<T> {
    Page {
        items,
        next_cursor: next_cursor.map(str::to_owned),
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 3, 1, 0, 0, 0).unwrap()
}

pub fn post(source_id: &str, id: &str, updated: DateTime<Utc>) -> Post {
    Post {
        source_id: source_id.to_owned(),
        id: id.to_owned(),
        created_time: epoch(),
        updated_time: updated,
        likes: Some(1),
        comment_count: Some(0),
        shares: 0,
        message: Some(format!("post {id}")),
    }
}

pub fn comment(post_id: &str, id: &str) -> Comment {
    Comment {
        post_id: post_id.to_owned(),
        id: id.to_owned(),
        created_time: epoch(),
        from_id: Some("42".to_owned()),
        likes: Some(0),
        message: Some(format!("comment {id}")),
    }
}

pub fn settings(sources: &[&str]) -> MirrorSettings {
    MirrorSettings {
        sources: sources.iter().map(|s| (*s).to_owned()).collect(),
        post_limit: 25,
        comment_limit: 500,
        alive_age: Duration::hours(24),
        max_concurrent_fetches: 4,
        strict: false,
    }
}

pub fn transient(path: &str) -> GraphError {
    GraphError::Transient {
        path: path.to_owned(),
        message: "An unexpected error has occurred. Please retry your request later.".to_owned(),
    }
}

pub fn unavailable(path: &str) -> GraphError {
    GraphError::ObjectUnavailable {
        path: path.to_owned(),
        message: format!("Object with ID '{path}' does not exist"),
    }
}

pub fn api_error(path: &str) -> GraphError {
    GraphError::Api {
        path: path.to_owned(),
        code: 100,
        message: "Invalid parameter".to_owned(),
    }
}
