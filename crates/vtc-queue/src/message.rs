//! Received message types.

/// Single-use credential proving safe receipt of a queue message.
///
/// Deleting a message consumes the token by value, so a token cannot
/// be reused after the delete call regardless of its outcome.
#[derive(Debug)]
pub struct ReceiptToken(String);

impl ReceiptToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Consume the token, yielding the raw receipt handle.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// One message received from the queue.
///
/// The body is opaque bytes; decoding it is the parser's job, not the
/// queue client's.
#[derive(Debug)]
pub struct QueueMessage {
    /// Service-assigned message id (used for logging only)
    pub id: String,
    /// Raw message body
    pub body: Vec<u8>,
    /// Receipt token required to delete this message
    pub receipt: ReceiptToken,
}
