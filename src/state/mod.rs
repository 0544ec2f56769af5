pub mod chat;
pub mod toast;
pub mod transcript;

pub use chat::{ChatSession, ChatUpdate, SubmitOutcome, SubmitRejection, TurnSummary};
pub use toast::{Toast, ToastPhase};
pub use transcript::{
    reduce, Applied, Entry, MessageEntry, Role, ToolEntry, ToolStatus, Transcript,
};
