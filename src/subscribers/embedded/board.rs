//! # Board: the latest view of the pool and every hospital.
//!
//! Folds the notification stream into what an operator screen shows: the
//! available pool, one row per hospital (max, allocated, status) and a
//! bounded tail of `LOG` lines.
//!
//! ## Architecture
//! ```text
//! Allocator/drivers ──► Bus ──► SubscriberSet ──► Board::on_event()
//!                                                       │
//!                                                       ▼
//!                                            RwLock<BoardState>
//!                                   (available, rows, log tail, last_seq)
//! ```
//!
//! ## Rules
//! - Events with `seq <= last_seq` are **rejected** (stale)
//! - `HOSPITAL_INIT` creates or refreshes a row; other per-hospital events for
//!   an unknown hospital create the row on the fly
//! - Status tone: text containing `Denied` → [`Tone::Alert`],
//!   containing `Treating` → [`Tone::Busy`], otherwise [`Tone::Normal`]

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, LogLevel, Payload};
use crate::resources::ResourceVector;
use crate::subscribers::Subscribe;

const STARTING: &str = "Starting...";

/// Display emphasis of a hospital status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Plain status.
    Normal,
    /// Treating patients.
    Busy,
    /// Denied by the safety check.
    Alert,
}

impl Tone {
    fn of(status: &str) -> Self {
        if status.contains("Denied") {
            Tone::Alert
        } else if status.contains("Treating") {
            Tone::Busy
        } else {
            Tone::Normal
        }
    }
}

/// One hospital row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    /// Hospital name.
    pub name: Arc<str>,
    /// Latest declared maximum.
    pub max: ResourceVector,
    /// Latest holdings.
    pub allocated: ResourceVector,
    /// Latest status text.
    pub status: Arc<str>,
    /// Emphasis derived from `status`.
    pub tone: Tone,
}

/// One retained `LOG` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Sequence number of the source event.
    pub seq: u64,
    /// Severity.
    pub level: LogLevel,
    /// Text.
    pub text: Arc<str>,
}

/// Folded board state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    /// Available pool from the latest `GLOBAL` event.
    pub available: ResourceVector,
    /// Hospitals in first-seen order.
    pub rows: Vec<BoardRow>,
    /// Most recent `LOG` lines, oldest first.
    pub log: VecDeque<LogLine>,
    /// Highest sequence number applied.
    pub last_seq: u64,
}

impl BoardState {
    /// Row for `name`, if seen.
    pub fn row(&self, name: &str) -> Option<&BoardRow> {
        self.rows.iter().find(|r| &*r.name == name)
    }

    fn row_mut(&mut self, name: &Arc<str>) -> &mut BoardRow {
        let pos = match self.rows.iter().position(|r| r.name == *name) {
            Some(pos) => pos,
            None => {
                self.rows.push(BoardRow {
                    name: Arc::clone(name),
                    max: ResourceVector::ZERO,
                    allocated: ResourceVector::ZERO,
                    status: Arc::from(STARTING),
                    tone: Tone::Normal,
                });
                self.rows.len() - 1
            }
        };
        &mut self.rows[pos]
    }
}

/// Stateful sink folding events into a [`BoardState`].
pub struct Board {
    state: RwLock<BoardState>,
    log_tail: usize,
}

impl Board {
    /// Creates an empty board keeping at most `log_tail` log lines.
    pub fn new(log_tail: usize) -> Self {
        Self {
            state: RwLock::new(BoardState::default()),
            log_tail,
        }
    }

    /// Applies `ev` unless it is stale. Returns whether it was applied.
    pub async fn update(&self, ev: &Event) -> bool {
        let mut st = self.state.write().await;
        if ev.seq <= st.last_seq {
            return false;
        }
        st.last_seq = ev.seq;

        match (&ev.payload, &ev.subject) {
            (Payload::Available(v), _) => st.available = *v,
            (Payload::Log { level, text }, _) => {
                if self.log_tail == 0 {
                    return true;
                }
                while st.log.len() >= self.log_tail {
                    st.log.pop_front();
                }
                st.log.push_back(LogLine {
                    seq: ev.seq,
                    level: *level,
                    text: Arc::clone(text),
                });
            }
            (Payload::Init { max, allocated }, Some(name)) => {
                let row = st.row_mut(name);
                row.max = *max;
                row.allocated = *allocated;
            }
            (Payload::Allocated(v), Some(name)) => st.row_mut(name).allocated = *v,
            (Payload::Status(text), Some(name)) => {
                let row = st.row_mut(name);
                row.tone = Tone::of(text);
                row.status = Arc::clone(text);
            }
            _ => {}
        }
        true
    }

    /// Owned copy of the current state.
    pub async fn snapshot(&self) -> BoardState {
        self.state.read().await.clone()
    }

    /// Renders the board as a plain-text table followed by the last `lines`
    /// log lines.
    pub async fn render(&self, lines: usize) -> String {
        let st = self.state.read().await;
        let mut out = String::new();
        let _ = writeln!(out, "Available: {}", st.available);
        let _ = writeln!(
            out,
            "{:<14} {:<16} {:<16} Status",
            "Hospital", "Max", "Allocated"
        );
        for row in &st.rows {
            let marker = match row.tone {
                Tone::Alert => "!",
                Tone::Busy => "*",
                Tone::Normal => " ",
            };
            let _ = writeln!(
                out,
                "{:<14} {:<16} {:<16} {marker}{}",
                row.name,
                row.max.to_string(),
                row.allocated.to_string(),
                row.status
            );
        }
        let skip = st.log.len().saturating_sub(lines);
        for line in st.log.iter().skip(skip) {
            let _ = writeln!(out, "  #{:<6} {}", line.seq, line.text);
        }
        out
    }
}

#[async_trait]
impl Subscribe for Board {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "board"
    }
}
