use crate::engine::{ConversationEngine, EngineError};
use crate::session::{AuthError, SessionManager};
use crate::store::{Slots, StoreError};
use chrono::SecondsFormat;
use shared::models::{
    BalanceAdjustment, Character, CharacterRequest, Conversation, PublicUser, Reselect, Role,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const CSV_HEADER: &str = "conversationId,userId,messageId,timestamp,role,content";

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Admin access required")]
    Forbidden,
    #[error("Invalid character: {0}")]
    InvalidCharacter(&'static str),
    #[error("Character {0} not found")]
    CharacterNotFound(Uuid),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Dashboard operations. Every call checks the session's admin elevation first.
pub struct AdminService {
    slots: Arc<Slots>,
    session: Arc<SessionManager>,
    engine: Arc<ConversationEngine>,
}

impl AdminService {
    pub fn new(
        slots: Arc<Slots>,
        session: Arc<SessionManager>,
        engine: Arc<ConversationEngine>,
    ) -> Self {
        Self {
            slots,
            session,
            engine,
        }
    }

    fn authorize(&self) -> AdminResult<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(AdminError::Forbidden)
        }
    }

    pub async fn users(&self) -> AdminResult<Vec<PublicUser>> {
        self.authorize()?;
        Ok(self.session.users().await.iter().map(|u| u.public()).collect())
    }

    pub async fn adjust_balance(
        &self,
        user_id: Uuid,
        adjustment: BalanceAdjustment,
    ) -> AdminResult<PublicUser> {
        self.authorize()?;
        let user = self
            .session
            .adjust_balance(user_id, adjustment.amount, adjustment.operation)
            .await?;
        Ok(user.public())
    }

    pub async fn create_character(&self, request: CharacterRequest) -> AdminResult<Character> {
        self.authorize()?;
        validate(&request)?;
        let character = request.into_character(Uuid::new_v4());
        self.slots
            .characters
            .update_value(|characters| characters.push(character.clone()))
            .await?;
        tracing::info!(character_id = %character.id, name = %character.name, "Created character");
        Ok(character)
    }

    /// Replaces a character. Existing conversations keep their own prompt copy.
    pub async fn update_character(
        &self,
        character_id: Uuid,
        request: CharacterRequest,
    ) -> AdminResult<Character> {
        self.authorize()?;
        validate(&request)?;
        let character = request.into_character(character_id);
        self.slots
            .characters
            .try_update(|characters| {
                let slot = characters
                    .iter_mut()
                    .find(|c| c.id == character_id)
                    .ok_or(AdminError::CharacterNotFound(character_id))?;
                *slot = character.clone();
                Ok::<_, AdminError>(())
            })
            .await?;
        tracing::info!(%character_id, "Updated character");
        Ok(character)
    }

    /// Conversations with the character are left in place.
    pub async fn delete_character(&self, character_id: Uuid) -> AdminResult<()> {
        self.authorize()?;
        self.slots
            .characters
            .try_update(|characters| {
                let before = characters.len();
                characters.retain(|c| c.id != character_id);
                if characters.len() == before {
                    Err(AdminError::CharacterNotFound(character_id))
                } else {
                    Ok(())
                }
            })
            .await?;
        tracing::info!(%character_id, "Deleted character");
        Ok(())
    }

    /// Every conversation of every user, most recently updated first.
    pub async fn conversations(&self) -> AdminResult<Vec<Conversation>> {
        self.authorize()?;
        let mut conversations = self.slots.conversations.get().await;
        conversations.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(conversations)
    }

    pub async fn delete_conversation(&self, conversation_id: Uuid) -> AdminResult<Reselect> {
        self.authorize()?;
        Ok(self.engine.delete(conversation_id).await?)
    }

    pub async fn export_csv(&self) -> AdminResult<String> {
        self.authorize()?;
        Ok(conversations_csv(&self.slots.conversations.get().await))
    }
}

fn validate(request: &CharacterRequest) -> AdminResult<()> {
    if request.name.trim().is_empty() {
        return Err(AdminError::InvalidCharacter("name is required"));
    }
    if request.system_prompt.trim().is_empty() {
        return Err(AdminError::InvalidCharacter("system prompt is required"));
    }
    Ok(())
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// One row per message. Only the content column is quoted.
pub fn conversations_csv(conversations: &[Conversation]) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for conversation in conversations {
        let user = conversation
            .user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "guest".to_string());
        for message in &conversation.messages {
            lines.push(format!(
                "{},{},{},{},{},\"{}\"",
                conversation.id,
                user,
                message.id,
                message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                role_name(message.role),
                message.content.replace('"', "\"\"")
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionError, CompletionProvider};
    use crate::notify::LogNotifier;
    use crate::store::{LocalStore, Store};
    use async_trait::async_trait;
    use shared::models::{BalanceOperation, Message, SafetyLevel};

    struct Unreachable;

    #[async_trait]
    impl CompletionProvider for Unreachable {
        async fn send(
            &self,
            _transcript: &[Message],
            _system_prompt: &str,
            _safety: SafetyLevel,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Request("offline".into()))
        }
    }

    async fn service() -> (AdminService, Arc<SessionManager>, Arc<Slots>) {
        let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
        let slots = Arc::new(Slots::load(store).await);
        let session = Arc::new(SessionManager::new(slots.clone(), "root"));
        let engine = Arc::new(ConversationEngine::new(
            slots.clone(),
            session.clone(),
            Arc::new(Unreachable),
            Arc::new(LogNotifier),
        ));
        (
            AdminService::new(slots.clone(), session.clone(), engine),
            session,
            slots,
        )
    }

    fn request(name: &str, prompt: &str) -> CharacterRequest {
        CharacterRequest {
            name: name.into(),
            age: 25,
            image_url: "https://example.com/a.png".into(),
            gif_url: None,
            bio: "bio".into(),
            system_prompt: prompt.into(),
            tags: vec!["Friend".into()],
            about: Default::default(),
            gallery: vec![],
        }
    }

    #[tokio::test]
    async fn test_everything_requires_elevation() {
        let (admin, session, _) = service().await;
        assert!(matches!(admin.users().await, Err(AdminError::Forbidden)));
        assert!(matches!(admin.export_csv().await, Err(AdminError::Forbidden)));
        assert!(session.elevate_admin("root"));
        assert!(admin.users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_character_lifecycle() {
        let (admin, session, slots) = service().await;
        session.elevate_admin("root");
        let seeded = slots.characters.get().await.len();

        let err = admin.create_character(request("Lale", " ")).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidCharacter(_)));

        let created = admin.create_character(request("Lale", "You are Lale.")).await.unwrap();
        assert_eq!(slots.characters.get().await.len(), seeded + 1);

        let updated = admin
            .update_character(created.id, request("Laleh", "You are Laleh."))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Laleh");

        admin.delete_character(created.id).await.unwrap();
        assert_eq!(slots.characters.get().await.len(), seeded);
        assert!(matches!(
            admin.delete_character(created.id).await,
            Err(AdminError::CharacterNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_balance_adjustment_floors_at_zero() {
        let (admin, session, _) = service().await;
        let user = session.signup("ali@example.com", "pw").await.unwrap();
        session.elevate_admin("root");

        let adjusted = admin
            .adjust_balance(
                user.id,
                BalanceAdjustment {
                    amount: 40.0,
                    operation: BalanceOperation::Subtract,
                },
            )
            .await
            .unwrap();
        assert_eq!(adjusted.balance, 0.0);
    }

    #[test]
    fn test_csv_quotes_content_and_marks_guests() {
        let character = crate::seed::default_characters().remove(0);
        let mut owned = Conversation::new(Uuid::new_v4(), &character);
        owned.push(Message::user("she said \"hi\", then left", None));
        let mut guest = Conversation::new(Uuid::new_v4(), &character);
        guest.user_id = None;
        guest.push(Message::reply("hello", 1));

        let csv = conversations_csv(&[owned.clone(), guest]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with(&format!("{},{},", owned.id, owned.user_id.unwrap())));
        assert!(lines[1].ends_with(",user,\"she said \"\"hi\"\", then left\""));
        assert!(lines[2].contains(",guest,"));
        assert!(lines[2].ends_with(",assistant,\"hello\""));
    }
}
