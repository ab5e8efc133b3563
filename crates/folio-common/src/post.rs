//! Post and site settings records, as stored by the document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable post identifier.
///
/// New posts take the current time in milliseconds, matching what existing
/// stores already contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl PostId {
    pub fn generate() -> Self {
        PostId(Utc::now().timestamp_millis().max(0) as u64)
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which tab of the site a post belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Work,
    Program,
}

impl std::str::FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(PostKind::Work),
            "program" => Ok(PostKind::Program),
            other => Err(format!("unknown post type `{other}` (expected work or program)")),
        }
    }
}

/// A published post. `content` is the serialized editor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

impl Post {
    /// Create a post on first save, with a fresh id and timestamp.
    pub fn create(kind: PostKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: PostId::generate(),
            kind,
            title: title.into(),
            content: content.into(),
            date: Utc::now(),
        }
    }

    /// Replace the editable fields, keeping id and original date.
    pub fn revise(&self, kind: PostKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: self.id,
            kind,
            title: title.into(),
            content: content.into(),
            date: self.date,
        }
    }
}

/// The hosting application's post list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostCollection {
    posts: Vec<Post>,
}

impl PostCollection {
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// Replace the post with the same id, or append a new one.
    pub fn upsert(&mut self, post: Post) {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => self.posts.push(post),
        }
    }

    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        let idx = self.posts.iter().position(|p| p.id == id)?;
        Some(self.posts.remove(idx))
    }

    /// Posts of one kind, newest first.
    pub fn feed(&self, kind: PostKind) -> Vec<&Post> {
        let mut feed: Vec<&Post> = self.posts.iter().filter(|p| p.kind == kind).collect();
        feed.sort_by(|a, b| b.date.cmp(&a.date));
        feed
    }

    pub fn as_slice(&self) -> &[Post] {
        &self.posts
    }
}

pub const DEFAULT_BANNER_URL: &str = "https://picsum.photos/seed/portfolio/1600/900";

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub banner_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            banner_url: DEFAULT_BANNER_URL.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post_at(id: u64, kind: PostKind, day: u32) -> Post {
        Post {
            id: PostId(id),
            kind,
            title: format!("post {id}"),
            content: "<p>x</p>".into(),
            date: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_revise_keeps_id_and_date() {
        let original = post_at(7, PostKind::Work, 3);
        let revised = original.revise(PostKind::Program, "new", "<b>body</b>");
        assert_eq!(revised.id, original.id);
        assert_eq!(revised.date, original.date);
        assert_eq!(revised.kind, PostKind::Program);
        assert_eq!(revised.title, "new");
        assert_eq!(revised.content, "<b>body</b>");
    }

    #[test]
    fn test_create_has_fresh_id() {
        let post = Post::create(PostKind::Work, "t", "c");
        assert!(post.id.0 > 0);
        assert_eq!(post.title, "t");
    }

    #[test]
    fn test_json_shape() {
        let post = post_at(1700000000000, PostKind::Program, 2);
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["id"], 1700000000000u64);
        assert_eq!(json["type"], "program");
        assert_eq!(json["title"], "post 1700000000000");
        assert_eq!(json["date"], "2024-01-02T12:00:00Z");

        let back: Post = serde_json::from_value(json).unwrap();
        assert_eq!(back, post);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut posts = PostCollection::default();
        posts.upsert(post_at(1, PostKind::Work, 1));
        posts.upsert(post_at(2, PostKind::Work, 2));
        let edited = posts.get(PostId(1)).unwrap().revise(PostKind::Work, "edited", "c");
        posts.upsert(edited);

        assert_eq!(posts.len(), 2);
        assert_eq!(posts.get(PostId(1)).unwrap().title, "edited");
    }

    #[test]
    fn test_feed_filters_and_sorts_newest_first() {
        let posts = PostCollection::new(vec![
            post_at(1, PostKind::Work, 1),
            post_at(2, PostKind::Program, 5),
            post_at(3, PostKind::Work, 9),
            post_at(4, PostKind::Work, 4),
        ]);
        let ids: Vec<u64> = posts.feed(PostKind::Work).iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 4, 1]);
    }

    #[test]
    fn test_remove() {
        let mut posts = PostCollection::new(vec![post_at(1, PostKind::Work, 1)]);
        assert!(posts.remove(PostId(1)).is_some());
        assert!(posts.remove(PostId(1)).is_none());
        assert!(posts.is_empty());
    }

    #[test]
    fn test_settings_default_and_shape() {
        let settings: Settings = serde_json::from_str(r#"{"bannerUrl":"uploads/b.png"}"#).unwrap();
        assert_eq!(settings.banner_url, "uploads/b.png");
        assert_eq!(Settings::default().banner_url, DEFAULT_BANNER_URL);
    }
}
