//! In-memory message store
//!
//! Source of truth for guestbooks, messages, and admins. The cache only
//! ever holds copies of what this store returns.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{AdminId, AdminUser, Guestbook, GuestbookId, Message, MessageId};

// == Inputs ==
/// Fields of a guestbook being created.
#[derive(Debug, Clone, Default)]
pub struct NewGuestbook {
    pub website_url: String,
    pub admin_user_id: AdminId,
    pub requires_approval: bool,
    pub challenge_question: String,
    pub challenge_answer: String,
    pub challenge_hint: String,
    pub allowed_origins: String,
}

/// Owner-editable settings of an existing guestbook.
#[derive(Debug, Clone, Default)]
pub struct GuestbookSettings {
    pub website_url: String,
    pub requires_approval: bool,
    pub challenge_question: String,
    pub challenge_answer: String,
    pub challenge_hint: String,
    pub allowed_origins: String,
}

/// Fields of a message or reply being created.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub guestbook_id: GuestbookId,
    pub name: String,
    pub text: String,
    pub website: Option<String>,
    pub approved: bool,
    pub parent_message_id: Option<MessageId>,
    pub author_admin_id: Option<AdminId>,
}

/// Admin edit of an existing message.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub name: String,
    pub text: String,
    pub website: Option<String>,
    pub approved: bool,
}

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    admins: HashMap<AdminId, AdminUser>,
    guestbooks: HashMap<GuestbookId, Guestbook>,
    /// Flat message table ordered by id
    messages: BTreeMap<MessageId, Message>,
    next_admin_id: AdminId,
    next_guestbook_id: GuestbookId,
    next_message_id: MessageId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Admins ==
    /// Returns the admin named `username`, creating the record on first sight.
    pub fn ensure_admin(&mut self, username: &str) -> AdminUser {
        if let Some(admin) = self.admin_by_username(username) {
            return admin.clone();
        }

        self.next_admin_id += 1;
        let admin = AdminUser {
            id: self.next_admin_id,
            username: username.to_string(),
            display_name: String::new(),
        };
        self.admins.insert(admin.id, admin.clone());
        admin
    }

    pub fn admin_by_username(&self, username: &str) -> Option<&AdminUser> {
        self.admins.values().find(|a| a.username == username)
    }

    pub fn set_display_name(&mut self, id: AdminId, display_name: &str) -> Result<AdminUser> {
        let admin = self
            .admins
            .get_mut(&id)
            .ok_or_else(admin_not_found)?;
        admin.display_name = display_name.to_string();
        Ok(admin.clone())
    }

    /// Rewrites the author name of every reply written by `admin_id`.
    ///
    /// Returns the guestbooks whose replies changed.
    pub fn rename_replies(&mut self, admin_id: AdminId, name: &str) -> BTreeSet<GuestbookId> {
        let now = Utc::now();
        let mut touched = BTreeSet::new();

        for message in self.messages.values_mut() {
            if message.author_admin_id == Some(admin_id) && message.is_reply() {
                if message.name != name {
                    message.name = name.to_string();
                    message.updated_at = now;
                }
                touched.insert(message.guestbook_id);
            }
        }
        touched
    }

    // == Guestbooks ==
    pub fn create_guestbook(&mut self, input: NewGuestbook) -> Guestbook {
        self.next_guestbook_id += 1;
        let guestbook = Guestbook {
            id: self.next_guestbook_id,
            website_url: input.website_url,
            admin_user_id: input.admin_user_id,
            requires_approval: input.requires_approval,
            challenge_question: input.challenge_question,
            challenge_answer: input.challenge_answer,
            challenge_hint: input.challenge_hint,
            allowed_origins: input.allowed_origins,
        };
        self.guestbooks.insert(guestbook.id, guestbook.clone());
        guestbook
    }

    pub fn guestbook(&self, id: GuestbookId) -> Result<&Guestbook> {
        self.guestbooks
            .get(&id)
            .ok_or_else(|| AppError::NotFound("Guestbook not found".to_string()))
    }

    /// Looks up a guestbook and checks that `admin_id` owns it.
    pub fn owned_guestbook(&self, id: GuestbookId, admin_id: AdminId) -> Result<&Guestbook> {
        let guestbook = self.guestbook(id)?;
        if guestbook.admin_user_id != admin_id {
            return Err(AppError::Unauthorized(
                "You don't own this guestbook".to_string(),
            ));
        }
        Ok(guestbook)
    }

    /// Resolves `username` to the existing admin owning `guestbook_id`.
    ///
    /// Unknown usernames own nothing and are not recorded.
    pub fn owner_of(&self, guestbook_id: GuestbookId, username: &str) -> Result<AdminUser> {
        self.guestbook(guestbook_id)?;
        let admin = self.admin_by_username(username).ok_or_else(|| {
            AppError::Unauthorized("You don't own this guestbook".to_string())
        })?;
        self.owned_guestbook(guestbook_id, admin.id)?;
        Ok(admin.clone())
    }

    pub fn update_guestbook(
        &mut self,
        id: GuestbookId,
        settings: GuestbookSettings,
    ) -> Result<Guestbook> {
        let guestbook = self
            .guestbooks
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Guestbook not found".to_string()))?;

        guestbook.website_url = settings.website_url;
        guestbook.requires_approval = settings.requires_approval;
        guestbook.challenge_question = settings.challenge_question;
        guestbook.challenge_answer = settings.challenge_answer;
        guestbook.challenge_hint = settings.challenge_hint;
        guestbook.allowed_origins = settings.allowed_origins;
        Ok(guestbook.clone())
    }

    /// Deletes a guestbook together with all of its messages.
    pub fn delete_guestbook(&mut self, id: GuestbookId) -> Result<Guestbook> {
        let guestbook = self
            .guestbooks
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Guestbook not found".to_string()))?;
        self.messages.retain(|_, m| m.guestbook_id != id);
        Ok(guestbook)
    }

    // == Messages ==
    pub fn create_message(&mut self, input: NewMessage) -> Result<Message> {
        self.guestbook(input.guestbook_id)?;

        let now = Utc::now();
        self.next_message_id += 1;
        let message = Message {
            id: self.next_message_id,
            created_at: now,
            updated_at: now,
            name: input.name,
            text: input.text,
            website: input.website,
            approved: input.approved,
            guestbook_id: input.guestbook_id,
            parent_message_id: input.parent_message_id,
            replies: Vec::new(),
            author_admin_id: input.author_admin_id,
        };
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    pub fn message(&self, id: MessageId) -> Result<&Message> {
        self.messages
            .get(&id)
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    /// Looks up a message and checks it belongs to `guestbook_id`.
    pub fn message_in(&self, guestbook_id: GuestbookId, id: MessageId) -> Result<&Message> {
        let message = self.message(id)?;
        if message.guestbook_id != guestbook_id {
            return Err(AppError::InvalidRequest(
                "Message does not belong to this guestbook".to_string(),
            ));
        }
        Ok(message)
    }

    pub fn update_message(&mut self, id: MessageId, update: MessageUpdate) -> Result<Message> {
        let message = self
            .messages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        message.name = update.name;
        message.text = update.text;
        message.website = update.website;
        message.approved = update.approved;
        message.updated_at = Utc::now();
        Ok(message.clone())
    }

    /// Deletes a message and any replies under it.
    pub fn delete_message(&mut self, id: MessageId) -> Result<Message> {
        let message = self
            .messages
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;
        self.messages.retain(|_, m| m.parent_message_id != Some(id));
        Ok(message)
    }

    /// Deletes every listed message, or none of them.
    ///
    /// Fails without deleting anything if any id is unknown or belongs to a
    /// different guestbook. Duplicate ids count once.
    pub fn bulk_delete(&mut self, guestbook_id: GuestbookId, ids: &[MessageId]) -> Result<usize> {
        let ids: BTreeSet<MessageId> = ids.iter().copied().collect();
        let all_owned = ids.iter().all(|id| {
            self.messages
                .get(id)
                .is_some_and(|m| m.guestbook_id == guestbook_id)
        });
        if !all_owned {
            return Err(AppError::InvalidRequest(
                "Some messages do not belong to this guestbook".to_string(),
            ));
        }

        self.messages.retain(|id, m| {
            !ids.contains(id) && !m.parent_message_id.is_some_and(|parent| ids.contains(&parent))
        });
        Ok(ids.len())
    }

    // == Public Reads ==
    /// Approved top-level messages, newest first, each carrying its approved
    /// replies oldest first.
    ///
    /// `limit` of `None` returns every thread from `offset` on.
    pub fn approved_threads(
        &self,
        guestbook_id: GuestbookId,
        offset: usize,
        limit: Option<usize>,
    ) -> Vec<Message> {
        let mut top: Vec<&Message> = self
            .messages
            .values()
            .filter(|m| m.guestbook_id == guestbook_id && m.approved && !m.is_reply())
            .collect();
        top.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        top.into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|m| self.with_replies(m))
            .collect()
    }

    fn with_replies(&self, parent: &Message) -> Message {
        let mut replies: Vec<Message> = self
            .messages
            .values()
            .filter(|m| m.parent_message_id == Some(parent.id) && m.approved)
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut thread = parent.clone();
        thread.replies = replies;
        thread
    }

    /// Number of approved messages in a guestbook, replies included.
    pub fn count_approved_messages(&self, guestbook_id: GuestbookId) -> u64 {
        self.messages
            .values()
            .filter(|m| m.guestbook_id == guestbook_id && m.approved)
            .count() as u64
    }
}

fn admin_not_found() -> AppError {
    AppError::NotFound("Admin user not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryStore, AdminUser, Guestbook) {
        let mut store = MemoryStore::new();
        let admin = store.ensure_admin("owner");
        let guestbook = store.create_guestbook(NewGuestbook {
            website_url: "https://example.com".into(),
            admin_user_id: admin.id,
            ..Default::default()
        });
        (store, admin, guestbook)
    }

    fn post(store: &mut MemoryStore, guestbook_id: GuestbookId, text: &str, approved: bool) -> Message {
        store
            .create_message(NewMessage {
                guestbook_id,
                name: "visitor".into(),
                text: text.into(),
                approved,
                ..Default::default()
            })
            .unwrap()
    }

    fn reply(store: &mut MemoryStore, admin: &AdminUser, parent: &Message) -> Message {
        store
            .create_message(NewMessage {
                guestbook_id: parent.guestbook_id,
                name: admin.reply_name().to_string(),
                text: "thanks".into(),
                approved: true,
                parent_message_id: Some(parent.id),
                author_admin_id: Some(admin.id),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_ensure_admin_is_idempotent() {
        let mut store = MemoryStore::new();
        let a = store.ensure_admin("alice");
        let b = store.ensure_admin("alice");
        let c = store.ensure_admin("bob");

        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_threads_are_newest_first_with_replies() {
        let (mut store, admin, guestbook) = seeded();
        let first = post(&mut store, guestbook.id, "first", true);
        let second = post(&mut store, guestbook.id, "second", true);
        post(&mut store, guestbook.id, "pending", false);
        let r1 = reply(&mut store, &admin, &first);
        let r2 = reply(&mut store, &admin, &first);

        let threads = store.approved_threads(guestbook.id, 0, None);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, second.id);
        assert_eq!(threads[1].id, first.id);
        let reply_ids: Vec<_> = threads[1].replies.iter().map(|m| m.id).collect();
        assert_eq!(reply_ids, vec![r1.id, r2.id]);
        assert_eq!(store.count_approved_messages(guestbook.id), 4);
    }

    #[test]
    fn test_threads_pagination() {
        let (mut store, _, guestbook) = seeded();
        for i in 0..5 {
            post(&mut store, guestbook.id, &format!("m{i}"), true);
        }

        let page = store.approved_threads(guestbook.id, 2, Some(2));
        let texts: Vec<_> = page.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m1"]);
        assert!(store.approved_threads(guestbook.id, 10, Some(2)).is_empty());
    }

    #[test]
    fn test_create_message_requires_guestbook() {
        let mut store = MemoryStore::new();
        let result = store.create_message(NewMessage {
            guestbook_id: 42,
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete_message_cascades_replies() {
        let (mut store, admin, guestbook) = seeded();
        let parent = post(&mut store, guestbook.id, "parent", true);
        let child = reply(&mut store, &admin, &parent);

        store.delete_message(parent.id).unwrap();

        assert!(store.message(child.id).is_err());
        assert!(store.delete_message(parent.id).is_err());
    }

    #[test]
    fn test_bulk_delete_is_all_or_nothing() {
        let (mut store, admin, guestbook) = seeded();
        let other = store.create_guestbook(NewGuestbook {
            admin_user_id: admin.id,
            ..Default::default()
        });
        let a = post(&mut store, guestbook.id, "a", true);
        let b = post(&mut store, guestbook.id, "b", true);
        let foreign = post(&mut store, other.id, "x", true);

        let result = store.bulk_delete(guestbook.id, &[a.id, foreign.id]);
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert!(store.message(a.id).is_ok());

        assert_eq!(store.bulk_delete(guestbook.id, &[a.id, b.id, a.id]).unwrap(), 2);
        assert_eq!(store.count_approved_messages(guestbook.id), 0);
        assert!(store.message(foreign.id).is_ok());
    }

    #[test]
    fn test_rename_replies_reports_touched_guestbooks() {
        let (mut store, admin, guestbook) = seeded();
        let other = store.create_guestbook(NewGuestbook {
            admin_user_id: admin.id,
            ..Default::default()
        });
        let untouched = store.create_guestbook(NewGuestbook {
            admin_user_id: admin.id,
            ..Default::default()
        });
        let p1 = post(&mut store, guestbook.id, "p1", true);
        let p2 = post(&mut store, other.id, "p2", true);
        post(&mut store, untouched.id, "p3", true);
        let r1 = reply(&mut store, &admin, &p1);
        reply(&mut store, &admin, &p2);

        let touched = store.rename_replies(admin.id, "Friendly Admin");

        assert_eq!(touched, BTreeSet::from([guestbook.id, other.id]));
        assert_eq!(store.message(r1.id).unwrap().name, "Friendly Admin");
        assert_eq!(store.message(p1.id).unwrap().name, "visitor");
    }

    #[test]
    fn test_owned_guestbook() {
        let (mut store, _, guestbook) = seeded();
        let intruder = store.ensure_admin("intruder");

        assert!(matches!(
            store.owned_guestbook(guestbook.id, intruder.id),
            Err(AppError::Unauthorized(_))
        ));
        assert!(store.owned_guestbook(guestbook.id, guestbook.admin_user_id).is_ok());
    }

    #[test]
    fn test_owner_of_never_records_strangers() {
        let (mut store, admin, guestbook) = seeded();
        store.ensure_admin("intruder");

        assert_eq!(store.owner_of(guestbook.id, "owner").unwrap(), admin);
        assert!(matches!(
            store.owner_of(guestbook.id, "intruder"),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            store.owner_of(guestbook.id, "stranger"),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            store.owner_of(99, "owner"),
            Err(AppError::NotFound(_))
        ));
        assert!(store.admin_by_username("stranger").is_none());
    }

    #[test]
    fn test_update_guestbook_replaces_settings() {
        let (mut store, admin, guestbook) = seeded();

        let updated = store
            .update_guestbook(
                guestbook.id,
                GuestbookSettings {
                    website_url: "https://new.example.com".into(),
                    requires_approval: true,
                    challenge_question: "2+2?".into(),
                    challenge_answer: "4".into(),
                    challenge_hint: "a number".into(),
                    allowed_origins: "https://new.example.com".into(),
                },
            )
            .unwrap();

        assert_eq!(updated.admin_user_id, admin.id);
        assert_eq!(store.guestbook(guestbook.id).unwrap(), &updated);
        assert!(updated.requires_approval);
        assert_eq!(updated.challenge_answer, "4");
        assert!(matches!(
            store.update_guestbook(99, GuestbookSettings::default()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_guestbook_removes_messages() {
        let (mut store, _, guestbook) = seeded();
        let m = post(&mut store, guestbook.id, "bye", true);

        store.delete_guestbook(guestbook.id).unwrap();

        assert!(store.guestbook(guestbook.id).is_err());
        assert!(store.message(m.id).is_err());
    }
}
