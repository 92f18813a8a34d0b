//! `spec.md` §9 "Cyclic references between post and parent... Represent as
//! `parent_id` keys into a post arena; never as bidirectional pointers.
//! Parent->reply edges are derived on insert."

use ember_types::Post;
use std::collections::HashMap;

pub type PostId = [u8; 16];

#[derive(Default)]
pub struct PostArena {
    posts: HashMap<PostId, Post>,
    /// Replies that arrived before their parent; keyed by the missing
    /// parent id.
    unresolved_parents: HashMap<PostId, Vec<PostId>>,
}

impl PostArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn get_mut(&mut self, id: &PostId) -> Option<&mut Post> {
        self.posts.get_mut(id)
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.posts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Inserts `post`, deriving the parent->reply edge if the parent is
    /// already present, and recording an unresolved reference otherwise.
    /// Returns `false` without mutating state if `post.id` is already
    /// present (idempotence, `spec.md` §8).
    pub fn insert(&mut self, post: Post) -> bool {
        if self.posts.contains_key(&post.id) {
            return false;
        }
        let id = post.id;
        let parent_id = post.parent_id;
        self.posts.insert(id, post);
        match parent_id {
            Some(parent_id) if self.posts.contains_key(&parent_id) => {
                if let Some(parent) = self.posts.get_mut(&parent_id) {
                    parent.replies.insert(id);
                }
            }
            Some(parent_id) => {
                self.unresolved_parents.entry(parent_id).or_default().push(id);
            }
            None => {}
        }
        // The newly inserted post may itself resolve earlier orphaned replies.
        if let Some(children) = self.unresolved_parents.remove(&id) {
            if let Some(parent) = self.posts.get_mut(&id) {
                for child in children {
                    parent.replies.insert(child);
                }
            }
        }
        true
    }

    pub fn remove(&mut self, id: &PostId) -> Option<Post> {
        self.posts.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    /// `findRoot(id)`: walks `parent_id` links to the thread root.
    pub fn find_root(&self, id: &PostId) -> PostId {
        let mut current = *id;
        loop {
            match self.posts.get(&current).and_then(|p| p.parent_id) {
                Some(parent) if parent != current => current = parent,
                _ => return current,
            }
        }
    }

    /// All posts sharing `findRoot(id)` with `id`, for thread-level GC
    /// (`spec.md` §4.8 "Garbage collection").
    pub fn thread_members(&self, root: &PostId) -> Vec<PostId> {
        self.posts
            .values()
            .filter(|p| &self.find_root(&p.id) == root)
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::VdfProof;

    fn sample_post(id: u8, parent: Option<u8>) -> Post {
        Post {
            id: [id; 16],
            author: "alice".into(),
            author_pk: vec![1, 2, 3],
            timestamp: 0,
            parent_id: parent.map(|p| [p; 16]),
            content: "hello".into(),
            image_hash: None,
            image_meta: None,
            vdf_input: vec![],
            vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 1 },
            author_vdf_input: vec![],
            author_vdf_proof: VdfProof { y: vec![], pi: vec![], l: vec![], r: vec![], iterations: 1 },
            signature: vec![],
            carriers: Default::default(),
            replies: Default::default(),
            depth: 0,
            trust_score: 0.0,
            attesters: Default::default(),
            explicitly_carrying: false,
        }
    }

    #[test]
    fn inserting_twice_is_idempotent() {
        let mut arena = PostArena::new();
        assert!(arena.insert(sample_post(1, None)));
        assert!(!arena.insert(sample_post(1, None)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn reply_arriving_after_parent_attaches_immediately() {
        let mut arena = PostArena::new();
        arena.insert(sample_post(1, None));
        arena.insert(sample_post(2, Some(1)));
        assert!(arena.get(&[1u8; 16]).unwrap().replies.contains(&[2u8; 16]));
    }

    #[test]
    fn reply_arriving_before_parent_attaches_once_parent_arrives() {
        let mut arena = PostArena::new();
        arena.insert(sample_post(2, Some(1)));
        arena.insert(sample_post(1, None));
        assert!(arena.get(&[1u8; 16]).unwrap().replies.contains(&[2u8; 16]));
    }

    #[test]
    fn find_root_walks_to_the_top_of_the_thread() {
        let mut arena = PostArena::new();
        arena.insert(sample_post(1, None));
        arena.insert(sample_post(2, Some(1)));
        arena.insert(sample_post(3, Some(2)));
        assert_eq!(arena.find_root(&[3u8; 16]), [1u8; 16]);
    }
}
