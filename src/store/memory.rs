//! In-memory store used by router tests. Mirrors the SQL semantics of
//! [`super::PgStore`] closely enough for handler-level assertions.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::Store;
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, Role, User, UserPatch};
use crate::chat::repo::ChatRepo;
use crate::chat::repo_types::{Chat, ChatMessage, ChatStatus, NewMessage};
use crate::portatore::repo::PortatoreRepo;
use crate::portatore::repo_types::{Portatore, PortatoreProfile};
use crate::schools::repo::{School, SchoolRepo};
use crate::ucme::repo::UcmeRepo;
use crate::ucme::repo_types::{AssignOutcome, NewUcme, Ucme, UcmeStatus};

#[derive(Default)]
struct Tables {
    ticks: i64,
    users: HashMap<Uuid, User>,
    schools: HashMap<String, School>,
    portatori: HashMap<Uuid, Portatore>,
    ucme: HashMap<Uuid, Ucme>,
    chats: HashMap<Uuid, Chat>,
    messages: Vec<ChatMessage>,
}

impl Tables {
    /// Strictly increasing timestamps so ordering is deterministic.
    fn now(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::milliseconds(self.ticks)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Test seeding: insert a user with the given role flags.
    pub fn seed_user(&self, email: &str, role: Role, is_admin: bool) -> User {
        self.with(|t| {
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                display_name: email.split('@').next().unwrap_or(email).to_string(),
                password_hash: String::new(),
                role,
                is_admin,
                school_code: None,
                has_subscription: false,
                created_at: t.now(),
            };
            t.users.insert(user.id, user.clone());
            user
        })
    }

    pub fn user_count(&self) -> usize {
        self.with(|t| t.users.len())
    }

    pub fn ucme_count(&self) -> usize {
        self.with(|t| t.ucme.len())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.with(|t| t.users.values().find(|u| u.email == email).cloned()))
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.with(|t| t.users.get(&id).cloned()))
    }

    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        Ok(self.with(|t| {
            if t.users.values().any(|u| u.email == new.email) {
                return None;
            }
            let user = User {
                id: Uuid::new_v4(),
                email: new.email,
                display_name: new.display_name,
                password_hash: new.password_hash,
                role: Role::User,
                is_admin: false,
                school_code: None,
                has_subscription: false,
                created_at: t.now(),
            };
            t.users.insert(user.id, user.clone());
            Some(user)
        }))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        Ok(self.with(|t| {
            let mut all: Vec<User> = t.users.values().cloned().collect();
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            page(all, limit, offset)
        }))
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>> {
        Ok(self.with(|t| {
            let user = t.users.get_mut(&id)?;
            if let Some(name) = patch.display_name {
                user.display_name = name;
            }
            if let Some(role) = patch.role {
                user.role = role;
            }
            if let Some(flag) = patch.is_admin {
                user.is_admin = flag;
            }
            if let Some(code) = patch.school_code {
                user.school_code = code;
            }
            if let Some(flag) = patch.has_subscription {
                user.has_subscription = flag;
            }
            Some(user.clone())
        }))
    }

    async fn set_subscription_by_email(&self, email: &str, active: bool) -> anyhow::Result<bool> {
        Ok(self.with(|t| {
            match t.users.values_mut().find(|u| u.email == email) {
                Some(u) => {
                    u.has_subscription = active;
                    true
                }
                None => false,
            }
        }))
    }
}

#[async_trait]
impl SchoolRepo for MemoryStore {
    async fn list_schools(&self) -> anyhow::Result<Vec<School>> {
        Ok(self.with(|t| {
            let mut all: Vec<School> = t.schools.values().cloned().collect();
            all.sort_by(|a, b| a.name.cmp(&b.name));
            all
        }))
    }

    async fn find_school(&self, code: &str) -> anyhow::Result<Option<School>> {
        Ok(self.with(|t| t.schools.get(code).cloned()))
    }

    async fn create_school(&self, code: &str, name: &str) -> anyhow::Result<Option<School>> {
        Ok(self.with(|t| {
            if t.schools.contains_key(code) {
                return None;
            }
            let school = School {
                code: code.to_string(),
                name: name.to_string(),
            };
            t.schools.insert(school.code.clone(), school.clone());
            Some(school)
        }))
    }
}

#[async_trait]
impl PortatoreRepo for MemoryStore {
    async fn find_portatore(&self, user_id: Uuid) -> anyhow::Result<Option<Portatore>> {
        Ok(self.with(|t| t.portatori.get(&user_id).cloned()))
    }

    async fn list_active_portatori(&self) -> anyhow::Result<Vec<PortatoreProfile>> {
        Ok(self.with(|t| {
            let mut out: Vec<PortatoreProfile> = t
                .portatori
                .values()
                .filter(|p| p.active)
                .filter_map(|p| {
                    let u = t.users.get(&p.user_id)?;
                    Some(PortatoreProfile {
                        user_id: p.user_id,
                        display_name: u.display_name.clone(),
                        email: u.email.clone(),
                        bio: p.bio.clone(),
                        active: p.active,
                    })
                })
                .collect();
            out.sort_by(|a, b| a.display_name.cmp(&b.display_name));
            out
        }))
    }

    async fn upsert_portatore(
        &self,
        user_id: Uuid,
        bio: Option<String>,
        active: bool,
    ) -> anyhow::Result<Portatore> {
        Ok(self.with(|t| {
            let now = t.now();
            let entry = t.portatori.entry(user_id).or_insert_with(|| Portatore {
                user_id,
                bio: None,
                active,
                created_at: now,
            });
            if bio.is_some() {
                entry.bio = bio;
            }
            entry.active = active;
            entry.clone()
        }))
    }
}

#[async_trait]
impl UcmeRepo for MemoryStore {
    async fn insert_ucme(&self, new: NewUcme) -> anyhow::Result<Ucme> {
        Ok(self.with(|t| {
            let ucme = Ucme {
                id: Uuid::new_v4(),
                user_id: new.user_id,
                email: new.email,
                content: new.content,
                tone: new.tone,
                school_code: new.school_code,
                status: UcmeStatus::Ricevuta,
                portatore_id: None,
                response: None,
                responded_at: None,
                response_read: false,
                created_at: t.now(),
            };
            t.ucme.insert(ucme.id, ucme.clone());
            ucme
        }))
    }

    async fn find_ucme(&self, id: Uuid) -> anyhow::Result<Option<Ucme>> {
        Ok(self.with(|t| t.ucme.get(&id).cloned()))
    }

    async fn list_unassigned(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Ucme>> {
        Ok(self.with(|t| {
            let mut rows = select(t, |u| u.portatore_id.is_none());
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            page(rows, limit, offset)
        }))
    }

    async fn list_by_portatore(&self, portatore_id: Uuid) -> anyhow::Result<Vec<Ucme>> {
        Ok(self.with(|t| newest_first(select(t, |u| u.portatore_id == Some(portatore_id)))))
    }

    async fn list_by_author(&self, user_id: Uuid, email: &str) -> anyhow::Result<Vec<Ucme>> {
        Ok(self.with(|t| {
            newest_first(select(t, |u| {
                u.user_id == Some(user_id) || (u.user_id.is_none() && u.email == email)
            }))
        }))
    }

    async fn list_by_school(
        &self,
        school_code: &str,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Ucme>> {
        Ok(self.with(|t| {
            let rows = newest_first(select(t, |u| u.school_code.as_deref() == Some(school_code)));
            page(rows, limit, offset)
        }))
    }

    async fn count_by_status(&self, school_code: &str) -> anyhow::Result<Vec<(UcmeStatus, i64)>> {
        Ok(self.with(|t| {
            let mut counts: HashMap<UcmeStatus, i64> = HashMap::new();
            for u in t.ucme.values() {
                if u.school_code.as_deref() == Some(school_code) {
                    *counts.entry(u.status).or_default() += 1;
                }
            }
            counts.into_iter().collect()
        }))
    }

    async fn assign(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        force: bool,
    ) -> anyhow::Result<AssignOutcome> {
        Ok(self.with(|t| match t.ucme.get_mut(&id) {
            None => AssignOutcome::NotFound,
            Some(u) if u.portatore_id.is_some() && !force => AssignOutcome::AlreadyAssigned,
            Some(u) => {
                u.portatore_id = Some(portatore_id);
                AssignOutcome::Assigned(u.clone())
            }
        }))
    }

    async fn set_status(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        status: UcmeStatus,
    ) -> anyhow::Result<Option<Ucme>> {
        Ok(self.with(|t| {
            let u = t.ucme.get_mut(&id)?;
            if u.portatore_id != Some(portatore_id) {
                return None;
            }
            u.status = status;
            Some(u.clone())
        }))
    }

    async fn set_response(
        &self,
        id: Uuid,
        portatore_id: Uuid,
        text: &str,
    ) -> anyhow::Result<Option<Ucme>> {
        Ok(self.with(|t| {
            let now = t.now();
            let u = t.ucme.get_mut(&id)?;
            if u.portatore_id != Some(portatore_id) {
                return None;
            }
            u.response = Some(text.to_string());
            u.responded_at = Some(now);
            u.response_read = false;
            Some(u.clone())
        }))
    }

    async fn mark_response_read(&self, id: Uuid) -> anyhow::Result<Option<Ucme>> {
        Ok(self.with(|t| {
            let u = t.ucme.get_mut(&id)?;
            u.response_read = true;
            Some(u.clone())
        }))
    }
}

#[async_trait]
impl ChatRepo for MemoryStore {
    async fn find_chat_by_ucme(&self, ucme_id: Uuid) -> anyhow::Result<Option<Chat>> {
        Ok(self.with(|t| t.chats.values().find(|c| c.ucme_id == ucme_id).cloned()))
    }

    async fn create_chat(
        &self,
        ucme_id: Uuid,
        status: ChatStatus,
    ) -> anyhow::Result<(Chat, bool)> {
        Ok(self.with(|t| {
            if let Some(existing) = t.chats.values().find(|c| c.ucme_id == ucme_id) {
                return (existing.clone(), false);
            }
            let chat = Chat {
                id: Uuid::new_v4(),
                ucme_id,
                status,
                created_at: t.now(),
            };
            t.chats.insert(chat.id, chat.clone());
            (chat, true)
        }))
    }

    async fn set_chat_status(
        &self,
        chat_id: Uuid,
        status: ChatStatus,
    ) -> anyhow::Result<Option<Chat>> {
        Ok(self.with(|t| {
            let chat = t.chats.get_mut(&chat_id)?;
            chat.status = status;
            Some(chat.clone())
        }))
    }

    async fn list_messages(
        &self,
        chat_id: Uuid,
        after: Option<OffsetDateTime>,
    ) -> anyhow::Result<Vec<ChatMessage>> {
        Ok(self.with(|t| {
            t.messages
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .filter(|m| after.map_or(true, |ts| m.created_at > ts))
                .cloned()
                .collect()
        }))
    }

    async fn insert_message(&self, new: NewMessage) -> anyhow::Result<ChatMessage> {
        Ok(self.with(|t| {
            let msg = ChatMessage {
                id: Uuid::new_v4(),
                chat_id: new.chat_id,
                sender_id: new.sender_id,
                sender_role: new.sender_role,
                body: new.body,
                created_at: t.now(),
            };
            t.messages.push(msg.clone());
            msg
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

fn select(t: &Tables, pred: impl Fn(&Ucme) -> bool) -> Vec<Ucme> {
    t.ucme.values().filter(|u| pred(u)).cloned().collect()
}

fn newest_first(mut rows: Vec<Ucme>) -> Vec<Ucme> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}
