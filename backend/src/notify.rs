use uuid::Uuid;

/// Audible cue played when an assistant message lands in a conversation.
pub trait Notifier: Send + Sync {
    fn chime(&self, conversation_id: Uuid);
}

/// Records the cue in the log. Playback belongs to the client.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn chime(&self, conversation_id: Uuid) {
        tracing::info!(%conversation_id, "New assistant message");
    }
}
