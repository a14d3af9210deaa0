use crate::completion::CompletionProvider;
use crate::notices;
use crate::notify::Notifier;
use crate::session::{AuthError, SessionManager};
use crate::store::{Slots, StoreError};
use shared::billing::message_cost;
use shared::models::{
    Character, Conversation, ConversationSettingsRequest, ConversationSummary, Message,
    MessageAttachment, Reselect, User,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Conversation {0} not found")]
    NotFound(Uuid),
    #[error("Character {0} not found")]
    CharacterNotFound(Uuid),
    #[error("Character has no system prompt")]
    EmptySystemPrompt,
    #[error("Message needs text or an attachment")]
    EmptyMessage,
    #[error("A reply is already being generated for this conversation")]
    TurnInFlight,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of trying to add a user message.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    Appended(Conversation),
    /// The balance is empty: a notice was added and nothing should be sent.
    InsufficientBalance(Conversation),
}

/// Result of one full chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Replied {
        conversation: Conversation,
        user: User,
        cost: u32,
    },
    /// The provider failed. The conversation ends with a failure notice.
    Failed { conversation: Conversation },
    InsufficientBalance { conversation: Conversation },
    /// The conversation was deleted while the reply was in flight.
    Discarded,
}

/// Drives conversations: lookup, message flow, billing and read state.
pub struct ConversationEngine {
    slots: Arc<Slots>,
    session: Arc<SessionManager>,
    provider: Arc<dyn CompletionProvider>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Releases a conversation's in-flight mark when dropped.
struct TurnGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    conversation_id: Uuid,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.conversation_id);
    }
}

impl ConversationEngine {
    pub fn new(
        slots: Arc<Slots>,
        session: Arc<SessionManager>,
        provider: Arc<dyn CompletionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            slots,
            session,
            provider,
            notifier,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn character(&self, character_id: Uuid) -> EngineResult<Character> {
        self.slots
            .characters
            .get()
            .await
            .into_iter()
            .find(|c| c.id == character_id)
            .ok_or(EngineError::CharacterNotFound(character_id))
    }

    pub async fn get(&self, conversation_id: Uuid) -> EngineResult<Conversation> {
        self.slots
            .conversations
            .get()
            .await
            .into_iter()
            .find(|c| c.id == conversation_id)
            .ok_or(EngineError::NotFound(conversation_id))
    }

    /// Like [`get`](Self::get) but only for conversations owned by `user_id`.
    pub async fn get_owned(&self, conversation_id: Uuid, user_id: Uuid) -> EngineResult<Conversation> {
        let conversation = self.get(conversation_id).await?;
        if conversation.belongs_to(user_id) {
            Ok(conversation)
        } else {
            Err(EngineError::NotFound(conversation_id))
        }
    }

    /// Returns the user's most recently updated conversation with the
    /// character, creating one at the front of the list when none exists.
    pub async fn find_or_create(&self, user: &User, character: &Character) -> EngineResult<Conversation> {
        if character.system_prompt.trim().is_empty() {
            return Err(EngineError::EmptySystemPrompt);
        }

        let (conversation, created) = self
            .slots
            .conversations
            .try_update(|conversations| {
                let existing = conversations
                    .iter()
                    .filter(|c| c.belongs_to(user.id) && c.character_id == character.id)
                    .max_by_key(|c| c.last_updated);
                if let Some(existing) = existing {
                    return Ok::<_, EngineError>((existing.clone(), false));
                }
                let conversation = Conversation::new(user.id, character);
                conversations.insert(0, conversation.clone());
                Ok((conversation, true))
            })
            .await?;

        if created {
            tracing::info!(
                conversation_id = %conversation.id,
                character_id = %character.id,
                "Started conversation"
            );
        }
        Ok(conversation)
    }

    /// The user's conversations, most recently updated first.
    pub async fn user_conversations(&self, user_id: Uuid) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> = self
            .slots
            .conversations
            .get()
            .await
            .into_iter()
            .filter(|c| c.belongs_to(user_id))
            .collect();
        conversations.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        conversations
    }

    /// Sidebar rows. Conversations whose character no longer exists are skipped.
    pub async fn summaries(&self, user_id: Uuid) -> Vec<ConversationSummary> {
        let characters = self.slots.characters.get().await;
        self.user_conversations(user_id)
            .await
            .into_iter()
            .filter_map(|c| {
                let character = characters.iter().find(|ch| ch.id == c.character_id)?;
                Some(ConversationSummary {
                    id: c.id,
                    title: c.title.clone(),
                    character_id: c.character_id,
                    character_name: character.name.clone(),
                    last_message: c.last_message().map(|m| m.content.clone()),
                    last_updated: c.last_updated,
                    unread: c.unread_count(),
                })
            })
            .collect()
    }

    /// Unread assistant messages across all of the user's conversations.
    pub async fn total_unread(&self, user_id: Uuid) -> usize {
        self.slots
            .conversations
            .get()
            .await
            .iter()
            .filter(|c| c.belongs_to(user_id))
            .map(Conversation::unread_count)
            .sum()
    }

    async fn push_message(&self, conversation_id: Uuid, message: Message) -> EngineResult<Conversation> {
        self.slots
            .conversations
            .try_update(|conversations| {
                let conversation = conversations
                    .iter_mut()
                    .find(|c| c.id == conversation_id)
                    .ok_or(EngineError::NotFound(conversation_id))?;
                conversation.push(message);
                Ok(conversation.clone())
            })
            .await
    }

    pub async fn append_user_message(
        &self,
        conversation_id: Uuid,
        user: &User,
        content: &str,
        attachment: Option<MessageAttachment>,
    ) -> EngineResult<AppendOutcome> {
        self.get_owned(conversation_id, user.id).await?;

        if !user.can_afford_turn() {
            let conversation = self
                .push_message(conversation_id, Message::notice(notices::INSUFFICIENT_BALANCE))
                .await?;
            tracing::info!(user_id = %user.id, "Message refused, balance is empty");
            return Ok(AppendOutcome::InsufficientBalance(conversation));
        }

        let message = Message::user(content.trim(), attachment);
        if !message.has_payload() {
            return Err(EngineError::EmptyMessage);
        }

        let conversation = self.push_message(conversation_id, message).await?;
        Ok(AppendOutcome::Appended(conversation))
    }

    /// Asks the provider for a reply to the conversation as it stands now.
    ///
    /// A reply is only billed once it has been stored; if the conversation
    /// disappeared in the meantime the reply is dropped and nothing is charged.
    pub async fn complete_turn(&self, conversation_id: Uuid, user_id: Uuid) -> EngineResult<TurnOutcome> {
        let conversation = self.get_owned(conversation_id, user_id).await?;

        let result = self
            .provider
            .send(
                &conversation.messages,
                &conversation.system_prompt,
                conversation.safety_level,
            )
            .await;

        let (message, cost) = match result {
            Ok(text) => {
                let cost = message_cost(&text);
                (Message::reply(text, cost), Some(cost))
            }
            Err(e) => {
                tracing::warn!(%conversation_id, "Completion failed: {}", e);
                (Message::notice(e.notice()), None)
            }
        };

        let conversation = match self.push_message(conversation_id, message).await {
            Ok(conversation) => conversation,
            Err(EngineError::NotFound(_)) => {
                tracing::warn!(%conversation_id, "Conversation deleted before its reply arrived, discarding");
                return Ok(TurnOutcome::Discarded);
            }
            Err(e) => return Err(e),
        };

        self.chime(conversation_id).await;

        match cost {
            Some(cost) => {
                let user = self.session.debit(user_id, f64::from(cost)).await?;
                tracing::info!(%conversation_id, cost, balance = user.balance, "Turn completed");
                Ok(TurnOutcome::Replied {
                    conversation,
                    user,
                    cost,
                })
            }
            None => Ok(TurnOutcome::Failed { conversation }),
        }
    }

    /// Appends the user's message and, when allowed, completes the turn.
    /// Only one turn per conversation may be in flight.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        user: &User,
        content: &str,
        attachment: Option<MessageAttachment>,
    ) -> EngineResult<TurnOutcome> {
        let _guard = self.begin_turn(conversation_id)?;

        match self
            .append_user_message(conversation_id, user, content, attachment)
            .await?
        {
            AppendOutcome::InsufficientBalance(conversation) => {
                Ok(TurnOutcome::InsufficientBalance { conversation })
            }
            AppendOutcome::Appended(_) => self.complete_turn(conversation_id, user.id).await,
        }
    }

    fn begin_turn(&self, conversation_id: Uuid) -> EngineResult<TurnGuard<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(conversation_id) {
            return Err(EngineError::TurnInFlight);
        }
        Ok(TurnGuard {
            in_flight: &self.in_flight,
            conversation_id,
        })
    }

    async fn chime(&self, conversation_id: Uuid) {
        if !self.slots.muted.get().await {
            self.notifier.chime(conversation_id);
        }
    }

    /// Marks every assistant message as read. Writes only when something changed.
    pub async fn mark_read(&self, conversation_id: Uuid) -> EngineResult<Conversation> {
        let conversation = self.get(conversation_id).await?;
        if conversation.unread_count() == 0 {
            return Ok(conversation);
        }

        self.slots
            .conversations
            .try_update(|conversations| {
                let conversation = conversations
                    .iter_mut()
                    .find(|c| c.id == conversation_id)
                    .ok_or(EngineError::NotFound(conversation_id))?;
                for message in conversation.messages.iter_mut().filter(|m| m.is_unread()) {
                    message.is_read = Some(true);
                }
                Ok(conversation.clone())
            })
            .await
    }

    /// Removes the conversation and reports where its owner should land if it
    /// was the one on screen.
    pub async fn delete(&self, conversation_id: Uuid) -> EngineResult<Reselect> {
        let removed = self
            .slots
            .conversations
            .try_update(|conversations| {
                let index = conversations
                    .iter()
                    .position(|c| c.id == conversation_id)
                    .ok_or(EngineError::NotFound(conversation_id))?;
                Ok::<_, EngineError>(conversations.remove(index))
            })
            .await?;
        tracing::info!(%conversation_id, "Deleted conversation");

        let next = match removed.user_id {
            Some(user_id) => self
                .user_conversations(user_id)
                .await
                .first()
                .map(|c| Reselect::Conversation { id: c.id }),
            None => None,
        };
        Ok(next.unwrap_or(Reselect::Catalog))
    }

    pub async fn update_settings(
        &self,
        conversation_id: Uuid,
        request: ConversationSettingsRequest,
    ) -> EngineResult<Conversation> {
        if request
            .system_prompt
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(EngineError::EmptySystemPrompt);
        }

        self.slots
            .conversations
            .try_update(|conversations| {
                let conversation = conversations
                    .iter_mut()
                    .find(|c| c.id == conversation_id)
                    .ok_or(EngineError::NotFound(conversation_id))?;
                if let Some(personality) = request.personality {
                    conversation.personality = personality;
                }
                if let Some(safety_level) = request.safety_level {
                    conversation.safety_level = safety_level;
                }
                if let Some(system_prompt) = request.system_prompt {
                    conversation.system_prompt = system_prompt;
                }
                Ok(conversation.clone())
            })
            .await
    }

    /// Copies an edited character's prompt into one conversation.
    pub async fn sync_system_prompt(
        &self,
        conversation_id: Uuid,
        character: &Character,
    ) -> EngineResult<Conversation> {
        let conversation = self.get(conversation_id).await?;
        if conversation.system_prompt == character.system_prompt {
            return Ok(conversation);
        }
        self.update_settings(
            conversation_id,
            ConversationSettingsRequest {
                system_prompt: Some(character.system_prompt.clone()),
                ..Default::default()
            },
        )
        .await
    }
}
