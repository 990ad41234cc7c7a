use engagemint_types::Post;

/// Default engagement threshold above which a post is held for verification.
pub const DEFAULT_LIKES_THRESHOLD: u64 = 100;

/// Default bound on the number of held posts.
pub const DEFAULT_MAX_PENDING: usize = 300;

/// Bounded holding set for posts whose engagement counts are too high to
/// trust from the bulk endpoint.
///
/// Entries stay sorted by likes, descending. When the set is full, the
/// lowest-likes entry overflows back into the normal scoring path, so the
/// set always holds the posts where spoofed counts would matter most.
#[derive(Debug, Clone)]
pub struct PendingSet {
    threshold: u64,
    cap: usize,
    entries: Vec<Post>,
}

impl PendingSet {
    pub fn new(threshold: u64, cap: usize) -> Self {
        Self {
            threshold,
            cap,
            entries: Vec::new(),
        }
    }

    /// Rebuild from entries loaded out of storage.
    pub fn restore(threshold: u64, cap: usize, mut entries: Vec<Post>) -> Self {
        entries.sort_by(|a, b| b.likes.cmp(&a.likes));
        entries.truncate(cap);
        Self {
            threshold,
            cap,
            entries,
        }
    }

    /// Whether a post's engagement is high enough to require verification.
    pub fn qualifies(&self, post: &Post) -> bool {
        post.likes > self.threshold
    }

    /// Hold a qualifying post.
    ///
    /// If the set is already at capacity, the lowest-likes entry (possibly
    /// the offered post itself) is returned for normal scoring.
    pub fn offer(&mut self, post: Post) -> Option<Post> {
        let position = self.entries.partition_point(|held| held.likes >= post.likes);
        self.entries.insert(position, post);
        if self.entries.len() > self.cap {
            self.entries.pop()
        } else {
            None
        }
    }

    /// Whether any held post belongs to this user.
    pub fn holds_user(&self, user_index: u32) -> bool {
        self.entries
            .iter()
            .any(|post| post.user_index == user_index)
    }

    /// Remove and return all held posts, highest engagement first.
    pub fn drain(&mut self) -> Vec<Post> {
        std::mem::take(&mut self.entries)
    }

    pub fn entries(&self) -> &[Post] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
