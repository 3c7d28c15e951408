//! Scripted run of the kiosk session without a window. Steps a fixed
//! sequence of intents through the core at 60 Hz against the null ports and
//! reports every session event with its simulated timestamp.

use std::{cell::RefCell, fs, path::Path, rc::Rc};

use anyhow::{Context, Result, ensure};
use kiosk_core::ports::NullPorts;
use kiosk_core::{Direction, QuantityAction, Session, SessionEvent};
use serde::Serialize;

const FRAME: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptAction {
    Navigate(Direction),
    Activate,
    Quantity(QuantityAction),
}

const SCRIPT: [ScriptAction; 8] = [
    ScriptAction::Navigate(Direction::Next),
    ScriptAction::Navigate(Direction::Next),
    ScriptAction::Activate,
    ScriptAction::Activate,
    ScriptAction::Quantity(QuantityAction::Decrement),
    ScriptAction::Navigate(Direction::Previous),
    ScriptAction::Navigate(Direction::Previous),
    ScriptAction::Navigate(Direction::Previous),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    pub t: f32,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// When each scripted action fires: evenly spaced inside `seconds`, leaving
/// a gap after the last one so its reveal can play out.
fn schedule(seconds: f32) -> Vec<(f32, ScriptAction)> {
    let gap = seconds / (SCRIPT.len() + 1) as f32;
    SCRIPT
        .iter()
        .enumerate()
        .map(|(index, action)| (gap * (index + 1) as f32, *action))
        .collect()
}

/// Drives `session` through the script and returns what it published.
/// The session is disposed at the end.
pub fn record(session: &mut Session, seconds: f32) -> Vec<TimedEvent> {
    let inbox: Rc<RefCell<Vec<SessionEvent>>> = Rc::default();
    let sink = Rc::clone(&inbox);
    session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let mut null = NullPorts::default();
    let mut recorded = Vec::new();
    session.init(&mut null.ports());
    drain(&inbox, 0.0, &mut recorded);

    let schedule = schedule(seconds);
    let mut steps = schedule.iter().peekable();
    let frames = (seconds / FRAME).ceil() as u32;
    for frame in 1..=frames {
        let t = frame as f32 * FRAME;
        while let Some((_, action)) = steps.next_if(|(at, _)| *at <= t) {
            let mut ports = null.ports();
            match *action {
                ScriptAction::Navigate(direction) => {
                    session.navigate(direction, &mut ports);
                }
                ScriptAction::Activate => session.activate(&mut ports),
                ScriptAction::Quantity(action) => {
                    session.quantity_action(action, &mut ports);
                }
            }
        }
        session.tick(FRAME, &mut null.ports());
        drain(&inbox, t, &mut recorded);
    }

    session.dispose();
    drain(&inbox, frames as f32 * FRAME, &mut recorded);
    recorded
}

fn drain(inbox: &RefCell<Vec<SessionEvent>>, t: f32, out: &mut Vec<TimedEvent>) {
    out.extend(
        inbox
            .borrow_mut()
            .drain(..)
            .map(|event| TimedEvent { t, event }),
    );
}

pub fn run(mut session: Session, seconds: f32, event_log: Option<&Path>) -> Result<()> {
    ensure!(
        seconds.is_finite() && seconds > 0.0,
        "headless_seconds must be positive (got {seconds})"
    );
    println!("Headless mode requested; running {seconds:.1}s scripted session.");

    let events = record(&mut session, seconds);
    for timed in &events {
        let json = serde_json::to_string(&timed.event).context("serializing session event")?;
        println!("[kiosk_viewer] t={:.2} {json}", timed.t);
    }

    let purchases = events
        .iter()
        .filter(|timed| matches!(timed.event, SessionEvent::PurchaseConfirmed { .. }))
        .count();
    println!(
        "Headless session finished: {} events, {} purchases, balance {:.2}",
        events.len(),
        purchases,
        session.wallet().balance()
    );

    if let Some(path) = event_log {
        let json = serde_json::to_string_pretty(&events).context("serializing event log")?;
        fs::write(path, json)
            .with_context(|| format!("writing event log to {}", path.display()))?;
        println!("Event log written to {}", path.display());
    }
    Ok(())
}
