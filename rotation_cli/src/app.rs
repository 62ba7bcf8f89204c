//! Interactive session state

use crate::commands::{Command, HELP};
use crate::error::CliError;
use crate::simulation::describe;
use rotation_core::resource::common;
use rotation_core::{ResourceKey, Session};
use std::fs;

/// A live session plus the output it has produced since the last prompt
pub struct App {
    pub session: Session,
    pub running: bool,
    output: Vec<String>,
}

impl App {
    pub fn new(session: Session) -> Self {
        App {
            session,
            running: true,
            output: Vec::new(),
        }
    }

    /// Lines produced by the previous commands
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Run one command, then collect whatever the engine reported
    pub fn handle(&mut self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Use(name) => {
                let availability = self.session.request_skill(&name)?;
                if !availability.is_ready() {
                    self.output.push(format!("{}: {}", name, availability.status));
                }
            }
            Command::Queue(name) => {
                let availability = self.session.use_skill_asap(&name)?;
                if !availability.is_ready() {
                    self.output.push(format!("{}: {}", name, availability.status));
                }
            }
            Command::Wait(secs) => {
                self.session.tick(secs)?;
            }
            Command::WaitForMana => {
                self.session.wait_for_mana()?;
            }
            Command::JumpTo(target) => {
                self.session.jump_to_timestamp(target)?;
            }
            Command::Toggle(name) => {
                let enabled = self.session.toggle_resource(&name)?;
                let state = if enabled { "on" } else { "off" };
                self.output.push(format!("{} is now {}", name, state));
            }
            Command::Undo => match self.session.undo_last()? {
                Some(node) => self.output.push(format!("removed {}", node)),
                None => self.output.push("nothing to undo".to_string()),
            },
            Command::Trim => self.session.remove_trailing_idle_time()?,
            Command::Status => self.status()?,
            Command::Skills => self.skills()?,
            Command::At(time) => {
                let snapshot = self.session.historical_state(time)?;
                self.output.push(serde_json::to_string_pretty(&snapshot)?);
            }
            Command::Save(path) => {
                let json = self.session.serialize().to_json()?;
                fs::write(&path, json)?;
                self.output.push(format!("saved {} actions to {}", self.session.record().len(), path));
            }
            Command::Help => self.output.push(HELP.to_string()),
            Command::Quit => self.running = false,
        }
        for report in self.session.drain_reports() {
            self.output.push(describe(&report));
        }
        Ok(())
    }

    fn status(&mut self) -> Result<(), CliError> {
        let engine = self.session.engine();
        let mana = engine.resource_amount(&ResourceKey::common(common::MANA))?;
        self.output.push(format!(
            "t={:.3}  mana={:.0}  actions={}",
            engine.display_time(),
            mana,
            self.session.record().len()
        ));
        let mut active = Vec::new();
        for rsc in engine.resources().iter() {
            if common::RESOURCES.contains(&rsc.key.name.as_str()) || rsc.available_amount() <= 0.0 {
                continue;
            }
            let remaining = engine.time_till_ready(&rsc.key)?;
            if remaining > 0.0 {
                active.push(format!("{} {:.0} ({:.1}s)", rsc.key.name, rsc.available_amount(), remaining));
            } else {
                active.push(format!("{} {:.0}", rsc.key.name, rsc.available_amount()));
            }
        }
        if !active.is_empty() {
            self.output.push(active.join(", "));
        }
        Ok(())
    }

    fn skills(&mut self) -> Result<(), CliError> {
        for availability in self.session.engine().skill_availabilities()? {
            self.output.push(format!(
                "{:<14} {:<40} stacks {}/{}",
                availability.skill.name,
                availability.status.to_string(),
                availability.stacks_available,
                availability.max_stacks
            ));
        }
        Ok(())
    }
}
