//! Periodic shopkeeper speech bubble with a typewriter reveal.

use crate::config::ShopkeeperConfig;
use crate::timers::TimerQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopkeeperUpdate {
    /// Visible prefix of the current line.
    Line { text: String, complete: bool },
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ShowNext,
    Hide,
}

#[derive(Debug, Clone)]
struct Typing {
    line: usize,
    elapsed: f32,
    shown: usize,
    total: usize,
    complete: bool,
}

#[derive(Debug, Clone)]
pub struct ShopkeeperDirector {
    config: ShopkeeperConfig,
    timers: TimerQueue<Step>,
    next_line: usize,
    current: Option<Typing>,
}

impl ShopkeeperDirector {
    pub fn new(config: ShopkeeperConfig) -> Self {
        let mut director = Self {
            config,
            timers: TimerQueue::new(),
            next_line: 0,
            current: None,
        };
        director.reset();
        director
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled && !self.config.lines.is_empty()
    }

    pub fn is_typing(&self) -> bool {
        self.current.as_ref().is_some_and(|typing| !typing.complete)
    }

    pub fn is_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Back to the initial wait; the next line shown is the first one.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.current = None;
        self.next_line = 0;
        if self.is_active() {
            self.timers.schedule(self.config.first_delay, Step::ShowNext);
        }
    }

    pub fn advance(&mut self, dt: f32) -> Vec<ShopkeeperUpdate> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut updates = Vec::new();
        let mut started = false;
        for step in self.timers.advance(dt) {
            match step {
                Step::ShowNext => {
                    let line = self.next_line;
                    self.next_line = (self.next_line + 1) % self.config.lines.len().max(1);
                    let total = self
                        .config
                        .lines
                        .get(line)
                        .map(|text| text.chars().count())
                        .unwrap_or(0);
                    self.current = Some(Typing {
                        line,
                        elapsed: 0.0,
                        shown: 0,
                        total,
                        complete: false,
                    });
                    started = true;
                    updates.push(ShopkeeperUpdate::Line {
                        text: String::new(),
                        complete: false,
                    });
                }
                Step::Hide => {
                    self.current = None;
                    updates.push(ShopkeeperUpdate::Hidden);
                    self.timers.schedule(self.config.interval, Step::ShowNext);
                }
            }
        }

        let cps = self.config.chars_per_second;
        let Some(typing) = self.current.as_mut() else {
            return updates;
        };
        if typing.complete {
            return updates;
        }
        if !started {
            typing.elapsed += dt;
        }
        let shown = if cps > 0.0 && cps.is_finite() {
            ((typing.elapsed * cps).floor() as usize).min(typing.total)
        } else {
            typing.total
        };
        if shown != typing.shown || shown == typing.total {
            typing.shown = shown;
            if let Some(update) = self.sync_progress() {
                updates.push(update);
            }
        }
        updates
    }

    /// Finishes the line being typed. Returns `None` when nothing is typing.
    pub fn skip(&mut self) -> Option<ShopkeeperUpdate> {
        let typing = self.current.as_mut().filter(|typing| !typing.complete)?;
        typing.shown = typing.total;
        self.sync_progress()
    }

    fn sync_progress(&mut self) -> Option<ShopkeeperUpdate> {
        let typing = self.current.as_mut()?;
        let line = self.config.lines.get(typing.line)?;
        let complete = typing.shown >= typing.total;
        if complete {
            typing.complete = true;
            self.timers.schedule(self.config.hold, Step::Hide);
        }
        Some(ShopkeeperUpdate::Line {
            text: line.chars().take(typing.shown).collect(),
            complete,
        })
    }
}
