// Library root for the assistant core: conversation state, scripted replies,
// simulated typing, briefings, and the patient/treatment record sources the
// dashboard reads from.

pub mod assistant;
pub mod briefing;
pub mod chat;
pub mod config;
pub mod records;
pub mod review;
