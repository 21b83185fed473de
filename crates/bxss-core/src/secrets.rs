/// Messaging credentials resolved from the secret store.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    pub messaging_credential: String,
    pub channel_id: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("messaging_credential", &"[redacted]")
            .field("channel_id", &self.channel_id)
            .finish()
    }
}
