// Conversation primitives: messages, the store that holds them, the keyword
// response engine, and the simulated typing reveal.

pub mod engine;
pub mod message;
pub mod reveal;
pub mod store;

pub use engine::{KeywordReply, ResponseEngine};
pub use message::{Message, MessageId, Sender};
pub use reveal::{RevealEvent, RevealPacing, RevealPlan, Scheduler, TokioScheduler};
pub use store::ConversationStore;
