//! # Chapter Tutor
//!
//! Answers student questions about a curriculum chapter by handing the
//! chapter's text, together with a tutor persona, to a locally hosted
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────┐   ┌──────────────┐
//! │  documents  │──▶│  Corpus  │──▶│    Tutor     │──▶ Ollama /api/chat
//! │  PDF / txt  │   │ (memory) │   │ (orchestrate)│
//! └─────────────┘   └──────────┘   └──────┬───────┘
//!                                         │
//!                            ┌────────────┴───────────┐
//!                            ▼                        ▼
//!                       ┌──────────┐            ┌──────────┐
//!                       │   CLI    │            │   HTTP   │
//!                       │ (tutor)  │            │  (axum)  │
//!                       └──────────┘            └──────────┘
//! ```
//!
//! The corpus is loaded once at startup and never changes afterwards.
//!
//! ## Quick Start
//!
//! ```bash
//! tutor chapters                          # show what was loaded
//! tutor ask Chapter1 "What is photosynthesis?"
//! tutor serve                             # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Document discovery and in-memory corpus |
//! | [`extract`] | PDF / plain-text extraction |
//! | [`llm`] | Chat model abstraction and Ollama client |
//! | [`tutor`] | Question answering orchestration |
//! | [`server`] | HTTP API |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod llm;
pub mod server;
pub mod tutor;
