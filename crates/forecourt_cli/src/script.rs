//! Interaction scripts for `forecourt pick`
//!
//! A script is a list of steps, each one argument on the command line:
//!
//! | step          | does                                  |
//! |---------------|---------------------------------------|
//! | `open`        | open the result surface               |
//! | `close`       | close it                              |
//! | `toggle`      | press the trigger                     |
//! | `type:<text>` | replace the search text               |
//! | `key:<name>`  | press a key (`down`, `up`, `enter`...) |
//! | `hover:<i>`   | move the pointer over row `i`         |
//! | `click:<i>`   | click row `i`                         |
//! | `wait:<ms>`   | let time pass (debounce, lookups)     |
//! | `outside`     | click outside the control             |
//!
//! After every step the rendered view is printed.

use anyhow::{bail, Context, Result};
use forecourt_cn::Combobox;
use forecourt_core::{Effect, Key, ReactiveContext};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Open,
    Close,
    Toggle,
    Type(String),
    Key(Key),
    Hover(usize),
    Click(usize),
    Wait(Duration),
    Outside,
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let step = match (name, arg) {
            ("open", None) => Step::Open,
            ("close", None) => Step::Close,
            ("toggle", None) => Step::Toggle,
            ("outside", None) => Step::Outside,
            ("type", Some(text)) => Step::Type(text.to_string()),
            ("key", Some(key_name)) => match Key::parse(key_name) {
                Key::Unknown => bail!("Unknown key '{}' in step '{}'", key_name, s),
                key => Step::Key(key),
            },
            ("hover", Some(row)) => Step::Hover(parse_row(row, s)?),
            ("click", Some(row)) => Step::Click(parse_row(row, s)?),
            ("wait", Some(ms)) => {
                let ms: u64 = ms
                    .parse()
                    .with_context(|| format!("Invalid duration in step '{}'", s))?;
                Step::Wait(Duration::from_millis(ms))
            }
            _ => bail!(
                "Invalid step '{}'. Valid steps: open, close, toggle, outside, type:<text>, key:<name>, hover:<i>, click:<i>, wait:<ms>",
                s
            ),
        };
        Ok(step)
    }
}

fn parse_row(row: &str, step: &str) -> Result<usize> {
    row.parse()
        .with_context(|| format!("Invalid row index in step '{}'", step))
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Open => f.write_str("open"),
            Step::Close => f.write_str("close"),
            Step::Toggle => f.write_str("toggle"),
            Step::Outside => f.write_str("outside"),
            Step::Type(text) => write!(f, "type {:?}", text),
            Step::Key(key) => write!(f, "key {:?}", key),
            Step::Hover(row) => write!(f, "hover {}", row),
            Step::Click(row) => write!(f, "click {}", row),
            Step::Wait(delay) => write!(f, "wait {}ms", delay.as_millis()),
        }
    }
}

/// Parse command-line steps
pub fn parse_steps<S: AsRef<str>>(steps: &[S]) -> Result<Vec<Step>> {
    steps.iter().map(|s| s.as_ref().parse()).collect()
}

/// Last revision the host saw from a combobox
#[derive(Debug, Clone, Default)]
pub struct RevisionWatch {
    seen: Arc<AtomicU64>,
}

impl RevisionWatch {
    /// Subscribe an effect to `combobox`'s revision signal
    pub fn subscribe(ctx: &ReactiveContext, combobox: &Combobox) -> (Self, Effect) {
        let watch = Self::default();
        let seen = Arc::clone(&watch.seen);
        let revision = combobox.revision().signal();
        let effect = ctx.effect(move |graph| {
            if let Some(revision) = graph.get(revision) {
                trace!(revision, "combobox changed");
                seen.store(revision, Ordering::SeqCst);
            }
        });
        (watch, effect)
    }

    /// Visible changes published so far
    pub fn changes(&self) -> u64 {
        self.seen.load(Ordering::SeqCst)
    }
}

/// Replay `steps` against `combobox`, printing the view after each
pub async fn run(combobox: &Combobox, steps: &[Step], out: &mut impl Write) -> Result<()> {
    write!(out, "{}", combobox.view())?;

    for step in steps {
        apply(combobox, step).await;

        writeln!(out, "> {}", step)?;
        write!(out, "{}", combobox.view())?;
        if let Some(focus) = combobox.after_render() {
            let selection = if focus.select_all { ", text selected" } else { "" };
            writeln!(out, "  (search focused{})", selection)?;
        }
    }
    Ok(())
}

async fn apply(combobox: &Combobox, step: &Step) {
    match step {
        Step::Open => combobox.open(),
        Step::Close => combobox.close(),
        Step::Toggle => combobox.toggle(),
        Step::Outside => combobox.outside_interaction(),
        Step::Type(text) => combobox.set_search_text(text),
        Step::Key(key) => {
            let response = combobox.handle_key(*key);
            trace!(?key, ?response, "key handled");
        }
        Step::Hover(row) => combobox.hover(*row),
        Step::Click(row) => combobox.click_row(*row),
        Step::Wait(delay) => tokio::time::sleep(*delay).await,
    }
}
