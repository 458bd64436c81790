use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{MemoryState, MemoryStore};
use crate::database::models::{Comment, Group, Membership, Post, Reaction, ReactionCount, ReactionToggle};
use crate::database::store::CommunityStore;
use crate::database::{Page, StoreError, StoreResult};
use crate::types::{Lifecycle, MembershipRole, ReactionKind};

const REACTION_ORDER: [ReactionKind; 4] = [
    ReactionKind::Like,
    ReactionKind::Love,
    ReactionKind::Support,
    ReactionKind::Hug,
];

impl MemoryState {
    fn group_view(&self, group: &Group) -> Group {
        let mut group = group.clone();
        group.member_count = self.memberships.keys().filter(|(g, _)| *g == group.id).count() as i64;
        group
    }

    fn post_view(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.reaction_count = self.reactions.keys().filter(|(p, _)| *p == post.id).count() as i64;
        post.comment_count = self
            .comments
            .values()
            .filter(|c| c.post_id == post.id && c.lifecycle.is_live())
            .count() as i64;
        post
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn create_group(&self, group: &Group) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.groups.insert(group.id, group.clone());
        let owner = Membership::new(group.id, group.creator_id, MembershipRole::Owner);
        state.memberships.insert((group.id, group.creator_id), owner);
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.get(&id).map(|g| state.group_view(g)))
    }

    async fn list_groups(&self, page: Page) -> StoreResult<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state
            .groups
            .values()
            .filter(|g| g.lifecycle.is_live())
            .map(|g| state.group_view(g))
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(groups))
    }

    async fn save_group(&self, group: &Group) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .groups
            .get_mut(&group.id)
            .filter(|g| g.lifecycle.is_live())
            .ok_or_else(|| StoreError::NotFound("Group".into()))?;
        existing.name = group.name.clone();
        existing.description = group.description.clone();
        existing.category = group.category.clone();
        existing.updated_at = group.updated_at;
        Ok(())
    }

    async fn soft_delete_group(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.groups.get_mut(&id).is_some_and(|group| {
            group.lifecycle.is_live() && {
                let now = Utc::now();
                group.lifecycle = Lifecycle::Deleted { at: now };
                group.updated_at = now;
                true
            }
        }))
    }

    async fn join_group(&self, membership: &Membership) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = (membership.group_id, membership.account_id);
        if state.memberships.contains_key(&key) {
            return Err(StoreError::Conflict("You are already a member of this group".into()));
        }
        state.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn find_membership(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self.state.read().await.memberships.get(&(group_id, account_id)).cloned())
    }

    async fn leave_group(&self, group_id: Uuid, account_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .memberships
            .remove(&(group_id, account_id))
            .is_some())
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        self.state.write().await.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.get(&id).map(|p| state.post_view(p)))
    }

    async fn list_posts(&self, group_id: Option<Uuid>, page: Page) -> StoreResult<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.lifecycle.is_live() && group_id.map_or(true, |g| p.group_id == Some(g)))
            .map(|p| state.post_view(p))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(posts))
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .posts
            .get_mut(&post.id)
            .filter(|p| p.lifecycle.is_live())
            .ok_or_else(|| StoreError::NotFound("Post".into()))?;
        existing.content = post.content.clone();
        existing.image_url = post.image_url.clone();
        existing.updated_at = post.updated_at;
        Ok(())
    }

    async fn soft_delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.posts.get_mut(&id).is_some_and(|post| {
            post.lifecycle.is_live() && {
                let now = Utc::now();
                post.lifecycle = Lifecycle::Deleted { at: now };
                post.updated_at = now;
                true
            }
        }))
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.state.write().await.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, post_id: Uuid, page: Page) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.lifecycle.is_live())
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(page.apply(comments))
    }

    async fn soft_delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.comments.get_mut(&id).is_some_and(|comment| {
            comment.lifecycle.is_live() && {
                let now = Utc::now();
                comment.lifecycle = Lifecycle::Deleted { at: now };
                comment.updated_at = now;
                true
            }
        }))
    }

    async fn toggle_reaction(&self, post_id: Uuid, account_id: Uuid, kind: ReactionKind) -> StoreResult<ReactionToggle> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(StoreError::NotFound("Post".into()));
        }
        let key = (post_id, account_id);
        let outcome = ReactionToggle::resolve(state.reactions.get(&key).map(|r| r.kind), kind);
        match outcome {
            ReactionToggle::Removed { .. } => {
                state.reactions.remove(&key);
            }
            ReactionToggle::Added { .. } | ReactionToggle::Changed { .. } => {
                state.reactions.insert(
                    key,
                    Reaction {
                        post_id,
                        account_id,
                        kind,
                        created_at: Utc::now(),
                    },
                );
            }
        }
        Ok(outcome)
    }

    async fn reaction_counts(&self, post_id: Uuid) -> StoreResult<Vec<ReactionCount>> {
        let state = self.state.read().await;
        Ok(REACTION_ORDER
            .iter()
            .map(|kind| ReactionCount {
                kind: *kind,
                count: state
                    .reactions
                    .values()
                    .filter(|r| r.post_id == post_id && r.kind == *kind)
                    .count() as i64,
            })
            .filter(|c| c.count > 0)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toggling_twice_restores_counts() {
        let store = MemoryStore::new();
        let post = Post::new(Uuid::new_v4(), None, "first kicks today".into(), None);
        store.insert_post(&post).await.unwrap();
        let reader = Uuid::new_v4();

        store.toggle_reaction(post.id, reader, ReactionKind::Love).await.unwrap();
        assert_eq!(store.find_post(post.id).await.unwrap().unwrap().reaction_count, 1);

        let switched = store.toggle_reaction(post.id, reader, ReactionKind::Hug).await.unwrap();
        assert_eq!(switched, ReactionToggle::Changed { from: ReactionKind::Love, to: ReactionKind::Hug });
        assert_eq!(store.find_post(post.id).await.unwrap().unwrap().reaction_count, 1);

        store.toggle_reaction(post.id, reader, ReactionKind::Hug).await.unwrap();
        assert_eq!(store.find_post(post.id).await.unwrap().unwrap().reaction_count, 0);
        assert!(store.reaction_counts(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn creator_is_owner_member() {
        let store = MemoryStore::new();
        let creator = Uuid::new_v4();
        let group = Group::new(creator, "Due in May".into(), None, None);
        store.create_group(&group).await.unwrap();

        let membership = store.find_membership(group.id, creator).await.unwrap().unwrap();
        assert_eq!(membership.role, MembershipRole::Owner);
        assert_eq!(store.find_group(group.id).await.unwrap().unwrap().member_count, 1);

        let again = Membership::new(group.id, creator, MembershipRole::Member);
        assert!(matches!(store.join_group(&again).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn stale_save_does_not_revive_deleted_post() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let post = Post::new(author, None, "hospital bag checklist".into(), None);
        store.insert_post(&post).await.unwrap();
        let mut stale = store.find_post(post.id).await.unwrap().unwrap();

        assert!(store.soft_delete_post(post.id).await.unwrap());
        assert!(!store.soft_delete_post(post.id).await.unwrap());

        stale.content = "edited after delete".into();
        assert!(matches!(store.save_post(&stale).await, Err(StoreError::NotFound(_))));

        let stored = store.find_post(post.id).await.unwrap().unwrap();
        assert!(!stored.lifecycle.is_live());
        assert_eq!(stored.content, "hospital bag checklist");
    }

    #[tokio::test]
    async fn group_edits_keep_deletion() {
        let store = MemoryStore::new();
        let group = Group::new(Uuid::new_v4(), "Night feeds".into(), None, None);
        store.create_group(&group).await.unwrap();
        let mut stale = store.find_group(group.id).await.unwrap().unwrap();

        stale.name = "Night feeds club".into();
        store.save_group(&stale).await.unwrap();
        assert_eq!(store.find_group(group.id).await.unwrap().unwrap().name, "Night feeds club");

        assert!(store.soft_delete_group(group.id).await.unwrap());
        assert!(matches!(store.save_group(&stale).await, Err(StoreError::NotFound(_))));
        assert!(!store.find_group(group.id).await.unwrap().unwrap().lifecycle.is_live());
        assert!(!store.soft_delete_group(Uuid::new_v4()).await.unwrap());
    }
}
