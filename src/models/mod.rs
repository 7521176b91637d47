pub mod conversation;
pub mod knowledge;
pub mod log;
pub mod processed_log;

pub use conversation::{Conversation, CreateConversationRequest, Message, NewMessage, Role};
pub use knowledge::{KnowledgeEntry, KnowledgeFilter, NewKnowledgeEntry, SolutionUpdate};
pub use log::{Log, Machine, NewLog};
pub use processed_log::{ErrorFilter, ErrorRecord, ProcessedLog, ResolvedUpdate, Sentiment};
